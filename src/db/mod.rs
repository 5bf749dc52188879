// Database access layer (SQLite via sqlx).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::seed::{QUESTION_MODE, SEED_AUTHOR, SEED_QUESTIONS};
use crate::strategy::{known_snapshot, StatDelta, StrategyStats, HUMAN_SOURCE, STRATEGIES};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub mode: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub source: String,
    pub user_name: Option<String>,
    pub strategy: Option<String>,
    pub created_at: i64,
}

impl Answer {
    pub fn is_human(&self) -> bool {
        self.source == HUMAN_SOURCE
    }

    /// Strategy credited with this answer, if it was machine generated.
    pub fn strategy_tag(&self) -> Option<&str> {
        if self.is_human() {
            None
        } else {
            self.strategy.as_deref()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Battle {
    pub id: String,
    pub question_id: String,
    pub answer1_id: String,
    pub answer2_id: String,
    pub created_at: i64,
}

/// A battle joined with its question text.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BattleDetail {
    pub id: String,
    pub question_id: String,
    pub question_text: String,
    pub answer1_id: String,
    pub answer2_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: String,
    pub battle_id: String,
    pub winner_answer_id: String,
    pub created_at: i64,
}

/// Fields of an answer about to be inserted.
#[derive(Debug, Clone)]
pub struct NewAnswer<'a> {
    pub question_id: &'a str,
    pub text: &'a str,
    pub source: &'a str,
    pub user_name: Option<&'a str>,
    pub strategy: Option<&'a str>,
}

/// Result of trying to record a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRecord {
    Recorded,
    /// A vote with the same id already exists; nothing was counted.
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceWins {
    pub source: String,
    pub wins: i64,
}

/// Vote counts grouped by the origin of the winning answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTotals {
    pub total_votes: i64,
    pub wins_by_source: Vec<SourceWins>,
}

impl VoteTotals {
    pub fn wins_for(&self, source: &str) -> i64 {
        self.wins_by_source
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.wins)
            .unwrap_or(0)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                mode TEXT NOT NULL DEFAULT 'quiplash',
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                id TEXT PRIMARY KEY,
                question_id TEXT NOT NULL REFERENCES questions(id),
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                user_name TEXT,
                strategy TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS battles (
                id TEXT PRIMARY KEY,
                question_id TEXT NOT NULL REFERENCES questions(id),
                answer1_id TEXT NOT NULL REFERENCES answers(id),
                answer2_id TEXT NOT NULL REFERENCES answers(id),
                created_at INTEGER NOT NULL,
                CHECK (answer1_id <> answer2_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                battle_id TEXT NOT NULL REFERENCES battles(id),
                winner_answer_id TEXT NOT NULL REFERENCES answers(id),
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS strategy_stats (
                strategy TEXT PRIMARY KEY,
                wins INTEGER NOT NULL DEFAULT 0,
                uses INTEGER NOT NULL DEFAULT 0,
                CHECK (wins >= 0 AND uses >= wins)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Questions ─────────────────────────────────────────────────────

    pub async fn question_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await
    }

    /// Insert the seed prompts and their human answers if no question exists.
    /// All rows go in one transaction. Returns whether anything was inserted.
    pub async fn seed_if_empty(&self) -> Result<bool, sqlx::Error> {
        if self.question_count().await? > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        let now = now_millis();
        for (i, q) in SEED_QUESTIONS.iter().enumerate() {
            let qid = new_id();
            // The first insert doubles as the emptiness check so the write
            // lock is held before anything is read; concurrent seeders wait on
            // the busy timeout instead of failing to upgrade a read lock.
            let sql = if i == 0 {
                "INSERT INTO questions (id, text, mode, created_at) SELECT ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM questions)"
            } else {
                "INSERT INTO questions (id, text, mode, created_at) VALUES (?, ?, ?, ?)"
            };
            let inserted = sqlx::query(sql)
                .bind(&qid)
                .bind(q.text)
                .bind(QUESTION_MODE)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            if inserted.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }

            for text in q.human_answers {
                sqlx::query(
                    "INSERT INTO answers (id, question_id, text, source, user_name, strategy, created_at) VALUES (?, ?, ?, ?, ?, NULL, ?)",
                )
                .bind(new_id())
                .bind(&qid)
                .bind(*text)
                .bind(HUMAN_SOURCE)
                .bind(SEED_AUTHOR)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn create_question(&self, text: &str) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "INSERT INTO questions (id, text, mode, created_at) VALUES (?, ?, ?, ?) RETURNING id, text, mode, created_at",
        )
        .bind(new_id())
        .bind(text)
        .bind(QUESTION_MODE)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_question(&self, id: &str) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "SELECT id, text, mode, created_at FROM questions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn random_question(&self) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "SELECT id, text, mode, created_at FROM questions ORDER BY RANDOM() LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    /// A random question that has at least two answers, i.e. can host a battle.
    pub async fn random_battle_question(&self) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.text, q.mode, q.created_at
            FROM questions q
            JOIN answers a ON a.question_id = q.id
            GROUP BY q.id
            HAVING COUNT(a.id) >= 2
            ORDER BY RANDOM()
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await
    }

    // ── Answers ───────────────────────────────────────────────────────

    pub async fn create_answer(&self, new: NewAnswer<'_>) -> Result<Answer, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            "INSERT INTO answers (id, question_id, text, source, user_name, strategy, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id, question_id, text, source, user_name, strategy, created_at",
        )
        .bind(new_id())
        .bind(new.question_id)
        .bind(new.text)
        .bind(new.source)
        .bind(new.user_name)
        .bind(new.strategy)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_answers(&self, question_id: &str) -> Result<Vec<Answer>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            "SELECT id, question_id, text, source, user_name, strategy, created_at FROM answers WHERE question_id = ? ORDER BY created_at, id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_answer(&self, id: &str) -> Result<Option<Answer>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            "SELECT id, question_id, text, source, user_name, strategy, created_at FROM answers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    // ── Battles ───────────────────────────────────────────────────────

    pub async fn create_battle(
        &self,
        question_id: &str,
        answer1_id: &str,
        answer2_id: &str,
    ) -> Result<Battle, sqlx::Error> {
        sqlx::query_as::<_, Battle>(
            "INSERT INTO battles (id, question_id, answer1_id, answer2_id, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id, question_id, answer1_id, answer2_id, created_at",
        )
        .bind(new_id())
        .bind(question_id)
        .bind(answer1_id)
        .bind(answer2_id)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_battle(&self, id: &str) -> Result<Option<BattleDetail>, sqlx::Error> {
        sqlx::query_as::<_, BattleDetail>(
            r#"
            SELECT b.id, b.question_id, q.text AS question_text, b.answer1_id, b.answer2_id
            FROM battles b
            JOIN questions q ON q.id = b.question_id
            WHERE b.id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Both answers of a battle, in battle order. Missing rows are skipped,
    /// so callers must check the length.
    pub async fn battle_answers(&self, battle: &BattleDetail) -> Result<Vec<Answer>, sqlx::Error> {
        let mut answers = Vec::with_capacity(2);
        for id in [&battle.answer1_id, &battle.answer2_id] {
            if let Some(a) = self.get_answer(id).await? {
                answers.push(a);
            }
        }
        Ok(answers)
    }

    // ── Votes & strategy stats ────────────────────────────────────────

    pub async fn get_vote(&self, id: &str) -> Result<Option<Vote>, sqlx::Error> {
        sqlx::query_as::<_, Vote>(
            "SELECT id, battle_id, winner_answer_id, created_at FROM votes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Make sure every known strategy has a stats row.
    pub async fn ensure_strategy_rows(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for s in STRATEGIES.iter() {
            sqlx::query("INSERT OR IGNORE INTO strategy_stats (strategy, wins, uses) VALUES (?, 0, 0)")
                .bind(s.name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_strategy_stats(&self) -> Result<Vec<StrategyStats>, sqlx::Error> {
        sqlx::query_as::<_, StrategyStats>(
            "SELECT strategy, wins, uses FROM strategy_stats ORDER BY strategy",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_strategy_stats(
        &self,
        strategy: &str,
    ) -> Result<Option<StrategyStats>, sqlx::Error> {
        sqlx::query_as::<_, StrategyStats>(
            "SELECT strategy, wins, uses FROM strategy_stats WHERE strategy = ?",
        )
        .bind(strategy)
        .fetch_optional(&self.pool)
        .await
    }

    /// Stats for the known strategies in declaration order, zeroed where absent.
    pub async fn strategy_snapshot(&self) -> Result<Vec<StrategyStats>, sqlx::Error> {
        let rows = self.list_strategy_stats().await?;
        Ok(known_snapshot(&rows))
    }

    /// Insert a vote and apply its stat deltas in one transaction.
    ///
    /// If `vote_id` is already taken the transaction is rolled back and
    /// nothing is counted again.
    pub async fn record_vote(
        &self,
        vote_id: &str,
        battle_id: &str,
        winner_answer_id: &str,
        deltas: &[StatDelta],
    ) -> Result<VoteRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO votes (id, battle_id, winner_answer_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(vote_id)
        .bind(battle_id)
        .bind(winner_answer_id)
        .bind(now_millis())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(VoteRecord::Duplicate);
        }

        for d in deltas {
            sqlx::query("INSERT OR IGNORE INTO strategy_stats (strategy, wins, uses) VALUES (?, 0, 0)")
                .bind(&d.strategy)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE strategy_stats SET uses = uses + ?, wins = wins + ? WHERE strategy = ?")
                .bind(d.uses)
                .bind(d.wins)
                .bind(&d.strategy)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(VoteRecord::Recorded)
    }

    pub async fn vote_totals(&self) -> Result<VoteTotals, sqlx::Error> {
        let total_votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.pool)
            .await?;
        let wins_by_source = sqlx::query_as::<_, SourceWins>(
            r#"
            SELECT a.source AS source, COUNT(*) AS wins
            FROM votes v
            JOIN answers a ON v.winner_answer_id = a.id
            GROUP BY a.source
            ORDER BY a.source
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(VoteTotals {
            total_votes,
            wins_by_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_answer_count;
    use crate::strategy::outcome_deltas;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn human<'a>(question_id: &'a str, text: &'a str) -> NewAnswer<'a> {
        NewAnswer {
            question_id,
            text,
            source: HUMAN_SOURCE,
            user_name: Some("B"),
            strategy: None,
        }
    }

    fn generated<'a>(question_id: &'a str, text: &'a str, strategy: &'a str) -> NewAnswer<'a> {
        let source = crate::strategy::find_strategy(strategy).unwrap().source;
        NewAnswer {
            question_id,
            text,
            source,
            user_name: None,
            strategy: Some(strategy),
        }
    }

    async fn stats(db: &Database, strategy: &str) -> (i64, i64) {
        let s = db.get_strategy_stats(strategy).await.unwrap().unwrap();
        (s.uses, s.wins)
    }

    #[tokio::test]
    async fn test_seed_once() {
        let db = test_db().await;
        assert!(db.random_question().await.unwrap().is_none());

        assert!(db.seed_if_empty().await.unwrap());
        assert!(!db.seed_if_empty().await.unwrap());

        assert_eq!(db.question_count().await.unwrap(), SEED_QUESTIONS.len() as i64);
        let answer_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(answer_count, seed_answer_count() as i64);

        let q = db.random_question().await.unwrap().unwrap();
        assert_eq!(q.mode, "quiplash");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_seed_on_file_db() {
        let path = std::env::temp_dir().join(format!("jokebattle-seed-{}.db", new_id()));
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let db = std::sync::Arc::new(Database::new(&url).await.unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.seed_if_empty().await })
            })
            .collect();
        let mut seeded = 0;
        for h in handles {
            if h.await.unwrap().unwrap() {
                seeded += 1;
            }
        }
        assert_eq!(seeded, 1);
        assert_eq!(db.question_count().await.unwrap(), SEED_QUESTIONS.len() as i64);

        drop(db);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_answers_crud() {
        let db = test_db().await;
        let q = db.create_question("Why did the crab cross?").await.unwrap();
        assert_eq!(db.get_question(&q.id).await.unwrap().unwrap().text, q.text);
        assert!(db.get_question("missing").await.unwrap().is_none());

        let h = db.create_answer(human(&q.id, "sideways")).await.unwrap();
        assert!(h.is_human());
        assert_eq!(h.strategy_tag(), None);
        assert_eq!(h.user_name.as_deref(), Some("B"));

        let g = db
            .create_answer(generated(&q.id, "for the claws", "gemini_v1"))
            .await
            .unwrap();
        assert_eq!(g.source, "gemini");
        assert_eq!(g.strategy_tag(), Some("gemini_v1"));

        let answers = db.list_answers(&q.id).await.unwrap();
        assert_eq!(answers.len(), 2);
    }

    #[tokio::test]
    async fn test_random_battle_question_needs_two_answers() {
        let db = test_db().await;
        let lonely = db.create_question("one answer").await.unwrap();
        db.create_answer(human(&lonely.id, "only me")).await.unwrap();
        assert!(db.random_battle_question().await.unwrap().is_none());

        let busy = db.create_question("two answers").await.unwrap();
        db.create_answer(human(&busy.id, "first")).await.unwrap();
        db.create_answer(human(&busy.id, "second")).await.unwrap();
        let picked = db.random_battle_question().await.unwrap().unwrap();
        assert_eq!(picked.id, busy.id);
    }

    #[tokio::test]
    async fn test_battle_roundtrip() {
        let db = test_db().await;
        let q = db.create_question("prompt").await.unwrap();
        let a = db.create_answer(human(&q.id, "a")).await.unwrap();
        let b = db
            .create_answer(generated(&q.id, "b", "qwen_v1"))
            .await
            .unwrap();

        let battle = db.create_battle(&q.id, &a.id, &b.id).await.unwrap();
        let detail = db.get_battle(&battle.id).await.unwrap().unwrap();
        assert_eq!(detail.question_text, "prompt");

        let answers = db.battle_answers(&detail).await.unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].id, a.id);
        assert_eq!(answers[1].id, b.id);

        assert!(db.get_battle("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_battle_rejects_self_pairing() {
        let db = test_db().await;
        let q = db.create_question("prompt").await.unwrap();
        let a = db.create_answer(human(&q.id, "a")).await.unwrap();
        assert!(db.create_battle(&q.id, &a.id, &a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_strategy_rows_idempotent() {
        let db = test_db().await;
        db.ensure_strategy_rows().await.unwrap();
        db.ensure_strategy_rows().await.unwrap();
        let rows = db.list_strategy_stats().await.unwrap();
        assert_eq!(rows.len(), STRATEGIES.len());
        assert!(rows.iter().all(|r| r.wins == 0 && r.uses == 0));
    }

    #[tokio::test]
    async fn test_snapshot_without_rows() {
        let db = test_db().await;
        let snap = db.strategy_snapshot().await.unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].strategy, "gemini_v1");
        assert_eq!(snap[1].strategy, "qwen_v1");
    }

    #[tokio::test]
    async fn test_human_beats_strategy() {
        let db = test_db().await;
        db.ensure_strategy_rows().await.unwrap();
        let q = db.create_question("prompt").await.unwrap();
        let h = db.create_answer(human(&q.id, "human")).await.unwrap();
        let g = db
            .create_answer(generated(&q.id, "bot", "gemini_v1"))
            .await
            .unwrap();
        let battle = db.create_battle(&q.id, &h.id, &g.id).await.unwrap();

        let deltas = outcome_deltas(h.strategy_tag(), g.strategy_tag());
        let rec = db.record_vote("v1", &battle.id, &h.id, &deltas).await.unwrap();
        assert_eq!(rec, VoteRecord::Recorded);

        assert_eq!(stats(&db, "gemini_v1").await, (1, 0));
        assert_eq!(stats(&db, "qwen_v1").await, (0, 0));
    }

    #[tokio::test]
    async fn test_strategy_beats_strategy() {
        let db = test_db().await;
        let q = db.create_question("prompt").await.unwrap();
        let g = db
            .create_answer(generated(&q.id, "g", "gemini_v1"))
            .await
            .unwrap();
        let w = db
            .create_answer(generated(&q.id, "w", "qwen_v1"))
            .await
            .unwrap();
        let battle = db.create_battle(&q.id, &g.id, &w.id).await.unwrap();

        // rows are created on demand by the vote itself
        let deltas = outcome_deltas(g.strategy_tag(), w.strategy_tag());
        db.record_vote("v1", &battle.id, &g.id, &deltas).await.unwrap();

        assert_eq!(stats(&db, "gemini_v1").await, (1, 1));
        assert_eq!(stats(&db, "qwen_v1").await, (1, 0));
    }

    #[tokio::test]
    async fn test_duplicate_vote_not_recounted() {
        let db = test_db().await;
        db.ensure_strategy_rows().await.unwrap();
        let q = db.create_question("prompt").await.unwrap();
        let h = db.create_answer(human(&q.id, "human")).await.unwrap();
        let g = db
            .create_answer(generated(&q.id, "bot", "qwen_v1"))
            .await
            .unwrap();
        let battle = db.create_battle(&q.id, &h.id, &g.id).await.unwrap();
        let deltas = outcome_deltas(g.strategy_tag(), h.strategy_tag());

        let first = db.record_vote("same", &battle.id, &g.id, &deltas).await.unwrap();
        let second = db.record_vote("same", &battle.id, &g.id, &deltas).await.unwrap();
        assert_eq!(first, VoteRecord::Recorded);
        assert_eq!(second, VoteRecord::Duplicate);

        assert_eq!(stats(&db, "qwen_v1").await, (1, 1));
        assert_eq!(db.vote_totals().await.unwrap().total_votes, 1);
        assert_eq!(db.get_vote("same").await.unwrap().unwrap().winner_answer_id, g.id);
    }

    #[tokio::test]
    async fn test_vote_totals_by_source() {
        let db = test_db().await;
        let empty = db.vote_totals().await.unwrap();
        assert_eq!(empty.total_votes, 0);
        assert_eq!(empty.wins_for("human"), 0);

        let q = db.create_question("prompt").await.unwrap();
        let h = db.create_answer(human(&q.id, "human")).await.unwrap();
        let g = db
            .create_answer(generated(&q.id, "bot", "gemini_v1"))
            .await
            .unwrap();
        let battle = db.create_battle(&q.id, &h.id, &g.id).await.unwrap();

        db.record_vote("a", &battle.id, &h.id, &[]).await.unwrap();
        db.record_vote("b", &battle.id, &h.id, &[]).await.unwrap();
        db.record_vote("c", &battle.id, &g.id, &[]).await.unwrap();

        let totals = db.vote_totals().await.unwrap();
        assert_eq!(totals.total_votes, 3);
        assert_eq!(totals.wins_for("human"), 2);
        assert_eq!(totals.wins_for("gemini"), 1);
        assert_eq!(totals.wins_for("qwen"), 0);
    }
}
