// Prompts and human answers inserted the first time the store is empty.

pub struct SeedQuestion {
    pub text: &'static str,
    pub human_answers: &'static [&'static str],
}

/// Author label attached to seeded human answers.
pub const SEED_AUTHOR: &str = "A";

pub const QUESTION_MODE: &str = "quiplash";

pub const SEED_QUESTIONS: &[SeedQuestion] = &[
    SeedQuestion {
        text: "What's the worst thing to scream on a trampoline while your parents are watching Seinfeld in the house?",
        human_answers: &["Huh, was my leg always bent like that?"],
    },
    SeedQuestion {
        text: "What's the nerdiest thing you could say on a first date?",
        human_answers: &["Our compatibility score is O(1)."],
    },
    SeedQuestion {
        text: "What's the worst possible name for a study group?",
        human_answers: &["Math Study Group"],
    },
    SeedQuestion {
        text: "What's an absolutely cursed way to start a college essay?",
        human_answers: &[
            "It all started when I opened ChatGPT.",
            "When I was in middle school, I was always much shorter than most adults.",
        ],
    },
    SeedQuestion {
        text: "What should be illegal to Google at 3 a.m.?",
        human_answers: &[
            "how to commit crimes (illegal at not 3 a.m too)",
            "how to make a script that automatically performs actions on a website",
        ],
    },
    SeedQuestion {
        text: "What's 2+2?",
        human_answers: &["™", "Erm actually, it's 4", "Capitalism."],
    },
    SeedQuestion {
        text: "How was the moon landing faked?",
        human_answers: &[
            "It wasn't you conspiracy theorist",
            "According to Bordino et al, repeated exposure to post-RGB light patterns can inhibit System 2 actions in the brain, allowing it to receive input without undergoing additional checks. Then, a -240Hz signal was broadcasted, tricking anyone who heard it into believing they watched a video of the moon landing",
        ],
    },
    SeedQuestion {
        text: "What's something you should never say to your doctor after you're born?",
        human_answers: &[
            "...",
            "*screams* FIRE!",
            "What's up gamers, welcome back to another speedrun of Homo Sapiens -- we're trying to go for a sub 30 second time today",
        ],
    },
    SeedQuestion {
        text: "What is the most suspicious thing to bring to an airport",
        human_answers: &["A lawyer."],
    },
    SeedQuestion {
        text: "What would your mom say if they saw your search history right now?",
        human_answers: &["\"I'm so proud you finally learned to use a search engine.\""],
    },
];

pub fn seed_answer_count() -> usize {
    SEED_QUESTIONS.iter().map(|q| q.human_answers.len()).sum()
}
