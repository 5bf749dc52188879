// HTTP API routes (questions, answers, battles, votes, stats).

use axum::{
    extract::{Json, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::db::{Answer, Database, NewAnswer, VoteRecord};
use crate::generator::{generate_or_placeholder, AnswerGenerator};
use crate::metrics;
use crate::strategy::{self, find_by_source, find_strategy, win_rate, HUMAN_SOURCE, STRATEGIES};

/// AI answers generated alongside every human submission.
pub const AI_ANSWERS_PER_SUBMISSION: usize = 2;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub answer_text: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub battle_id: String,
    #[serde(default)]
    pub winner_answer_id: String,
    /// Client-chosen id; resubmitting the same id does not count twice.
    #[serde(default)]
    pub vote_id: Option<String>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub epsilon: f64,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: sqlx::Error) -> impl IntoResponse {
    tracing::error!("Database error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>, generator: Arc<dyn AnswerGenerator>, epsilon: f64) -> Router {
    let state = AppState {
        db,
        generator,
        epsilon: strategy::clamp_epsilon(epsilon),
    };

    Router::new()
        .route("/api/random-question", get(random_question))
        .route("/api/submit-answer", post(submit_answer))
        .route("/api/random-battle", get(random_battle))
        .route("/api/vote", post(vote))
        .route("/api/results", get(results))
        .route("/api/admin-strategies", get(admin_strategies))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let response = next.run(req).await;
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

// ── Question handlers ─────────────────────────────────────────────────

async fn random_question(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.seed_if_empty().await {
        Ok(true) => tracing::info!("Seeded question bank"),
        Ok(false) => {}
        Err(e) => return internal_error(e).into_response(),
    }
    match state.db.random_question().await {
        Ok(Some(q)) => (StatusCode::OK, Json(json!({ "id": q.id, "text": q.text }))).into_response(),
        Ok(None) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "No questions available").into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

// ── Answer handlers ───────────────────────────────────────────────────

/// Author labels are a single character; blank means anonymous.
pub fn author_label(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .and_then(|s| s.chars().next())
        .map(|c| c.to_string())
}

async fn submit_answer(
    State(state): State<AppState>,
    Json(req): Json<SubmitAnswerRequest>,
) -> impl IntoResponse {
    let question_id = req.question_id.trim();
    let answer_text = req.answer_text.trim();
    if question_id.is_empty() || answer_text.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Missing questionId or answerText")
            .into_response();
    }
    let user_name = author_label(req.user_name.as_deref());

    let question = match state.db.get_question(question_id).await {
        Ok(Some(q)) => q,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Question not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
    };

    let human = match state
        .db
        .create_answer(NewAnswer {
            question_id: &question.id,
            text: answer_text,
            source: HUMAN_SOURCE,
            user_name: user_name.as_deref(),
            strategy: None,
        })
        .await
    {
        Ok(a) => a,
        Err(e) => return internal_error(e).into_response(),
    };
    metrics::ANSWERS_SUBMITTED_TOTAL
        .with_label_values(&[HUMAN_SOURCE])
        .inc();

    if let Err(e) = state.db.ensure_strategy_rows().await {
        return internal_error(e).into_response();
    }

    for _ in 0..AI_ANSWERS_PER_SUBMISSION {
        let snapshot = match state.db.strategy_snapshot().await {
            Ok(s) => s,
            Err(e) => return internal_error(e).into_response(),
        };
        let selection = {
            let mut rng = rand::thread_rng();
            strategy::select(&snapshot, state.epsilon, &mut rng)
        };
        let Some(selection) = selection else {
            break;
        };
        tracing::debug!(
            "Selected strategy {} ({})",
            selection.strategy,
            selection.mode.as_str()
        );
        metrics::STRATEGY_SELECTIONS_TOTAL
            .with_label_values(&[selection.strategy.as_str(), selection.mode.as_str()])
            .inc();

        let text =
            generate_or_placeholder(state.generator.as_ref(), &question.text, &selection.strategy)
                .await;
        let source = find_strategy(&selection.strategy)
            .map(|d| d.source)
            .unwrap_or(selection.strategy.as_str());

        if let Err(e) = state
            .db
            .create_answer(NewAnswer {
                question_id: &question.id,
                text: &text,
                source,
                user_name: None,
                strategy: Some(&selection.strategy),
            })
            .await
        {
            return internal_error(e).into_response();
        }
        metrics::ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[source])
            .inc();
    }

    (StatusCode::OK, Json(json!({ "ok": true, "answerId": human.id }))).into_response()
}

// ── Battle handlers ───────────────────────────────────────────────────

/// Shuffle a question's answers and take the first two as a battle pair.
pub fn pick_pair<R: Rng + ?Sized>(mut answers: Vec<Answer>, rng: &mut R) -> Option<(Answer, Answer)> {
    answers.shuffle(rng);
    let mut iter = answers.into_iter();
    let first = iter.next()?;
    let second = iter.find(|a| a.id != first.id)?;
    Some((first, second))
}

async fn random_battle(State(state): State<AppState>) -> impl IntoResponse {
    let question = match state.db.random_battle_question().await {
        Ok(Some(q)) => q,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "No battles yet").into_response(),
        Err(e) => return internal_error(e).into_response(),
    };

    let answers = match state.db.list_answers(&question.id).await {
        Ok(a) => a,
        Err(e) => return internal_error(e).into_response(),
    };

    let pair = {
        let mut rng = rand::thread_rng();
        pick_pair(answers, &mut rng)
    };
    let Some((first, second)) = pair else {
        return json_error(StatusCode::NOT_FOUND, "Not enough answers for a battle")
            .into_response();
    };

    let battle = match state
        .db
        .create_battle(&question.id, &first.id, &second.id)
        .await
    {
        Ok(b) => b,
        Err(e) => return internal_error(e).into_response(),
    };
    metrics::BATTLES_CREATED_TOTAL.inc();

    let mut display = [first, second];
    display.shuffle(&mut rand::thread_rng());

    (
        StatusCode::OK,
        Json(json!({
            "battleId": battle.id,
            "questionText": question.text,
            "answers": display
                .iter()
                .map(|a| json!({ "id": a.id, "text": a.text }))
                .collect::<Vec<_>>(),
        })),
    )
        .into_response()
}

// ── Vote handlers ─────────────────────────────────────────────────────

/// Label revealed after voting: author or `User` for humans, the strategy
/// label for generated answers, the upper-cased source otherwise.
pub fn reveal_label(answer: &Answer) -> String {
    if answer.is_human() {
        return answer
            .user_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "User".to_string());
    }
    match find_by_source(&answer.source) {
        Some(def) => def.label.to_string(),
        None => answer.source.to_uppercase(),
    }
}

fn reveal(answer: &Answer) -> Value {
    json!({
        "id": answer.id,
        "text": answer.text,
        "source": answer.source,
        "label": reveal_label(answer),
    })
}

/// Split a battle's answers into (winner, loser) given the winner's id.
pub fn split_winner<'a>(answers: &'a [Answer], winner_id: &str) -> Option<(&'a Answer, &'a Answer)> {
    match answers {
        [a, b] if a.id == winner_id => Some((a, b)),
        [a, b] if b.id == winner_id => Some((b, a)),
        _ => None,
    }
}

async fn vote(State(state): State<AppState>, Json(req): Json<VoteRequest>) -> impl IntoResponse {
    let battle_id = req.battle_id.trim();
    let winner_answer_id = req.winner_answer_id.trim();
    if battle_id.is_empty() || winner_answer_id.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Missing battleId or winnerAnswerId")
            .into_response();
    }

    let battle = match state.db.get_battle(battle_id).await {
        Ok(Some(b)) => b,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Battle not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
    };

    let answers = match state.db.battle_answers(&battle).await {
        Ok(a) => a,
        Err(e) => return internal_error(e).into_response(),
    };
    if answers.len() != 2 {
        tracing::error!("Battle {} is missing answers", battle.id);
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Answers missing").into_response();
    }

    let Some((winner, loser)) = split_winner(&answers, winner_answer_id) else {
        return json_error(StatusCode::BAD_REQUEST, "Winner not in this battle").into_response();
    };

    let vote_id = req
        .vote_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let deltas = strategy::outcome_deltas(winner.strategy_tag(), loser.strategy_tag());
    let record = match state
        .db
        .record_vote(&vote_id, &battle.id, &winner.id, &deltas)
        .await
    {
        Ok(r) => r,
        Err(e) => return internal_error(e).into_response(),
    };

    match record {
        VoteRecord::Recorded => {
            tracing::info!(
                "Vote {vote_id} on battle {}: {} beat {}",
                battle.id,
                winner.source,
                loser.source
            );
            metrics::VOTES_TOTAL
                .with_label_values(&[winner.source.as_str()])
                .inc();
        }
        VoteRecord::Duplicate => {
            match state.db.get_vote(&vote_id).await {
                Ok(Some(existing))
                    if existing.battle_id == battle.id && existing.winner_answer_id == winner.id => {}
                Ok(_) => {
                    return json_error(StatusCode::CONFLICT, "Vote id already used")
                        .into_response();
                }
                Err(e) => return internal_error(e).into_response(),
            }
            tracing::debug!("Vote {vote_id} already recorded");
            metrics::DUPLICATE_VOTES_TOTAL.inc();
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "voteId": vote_id,
            "duplicate": record == VoteRecord::Duplicate,
            "questionText": battle.question_text,
            "winner": reveal(winner),
            "loser": reveal(loser),
        })),
    )
        .into_response()
}

// ── Stats handlers ────────────────────────────────────────────────────

async fn results(State(state): State<AppState>) -> impl IntoResponse {
    let totals = match state.db.vote_totals().await {
        Ok(t) => t,
        Err(e) => return internal_error(e).into_response(),
    };

    let mut body = Map::new();
    body.insert("total_votes".into(), json!(totals.total_votes));
    for source in std::iter::once(HUMAN_SOURCE).chain(STRATEGIES.iter().map(|s| s.source)) {
        body.insert(
            format!("{source}_win_rate"),
            json!(win_rate(totals.wins_for(source), totals.total_votes)),
        );
    }
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

async fn admin_strategies(State(state): State<AppState>) -> impl IntoResponse {
    let stats = match state.db.list_strategy_stats().await {
        Ok(s) => s,
        Err(e) => return internal_error(e).into_response(),
    };
    let totals = match state.db.vote_totals().await {
        Ok(t) => t,
        Err(e) => return internal_error(e).into_response(),
    };

    let strategies: Vec<Value> = stats
        .iter()
        .map(|s| {
            json!({
                "strategy": s.strategy,
                "wins": s.wins,
                "uses": s.uses,
                "win_rate": win_rate(s.wins, s.uses),
            })
        })
        .collect();

    let mut summary = Map::new();
    summary.insert("total_votes".into(), json!(totals.total_votes));
    for source in std::iter::once(HUMAN_SOURCE).chain(STRATEGIES.iter().map(|s| s.source)) {
        summary.insert(format!("{source}_wins"), json!(totals.wins_for(source)));
    }

    (
        StatusCode::OK,
        Json(json!({ "strategies": strategies, "totals": summary })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn answer(id: &str, source: &str, user_name: Option<&str>) -> Answer {
        Answer {
            id: id.to_string(),
            question_id: "q".to_string(),
            text: format!("text {id}"),
            source: source.to_string(),
            user_name: user_name.map(str::to_string),
            strategy: find_by_source(source).map(|d| d.name.to_string()),
            created_at: 0,
        }
    }

    #[test]
    fn test_author_label() {
        assert_eq!(author_label(None), None);
        assert_eq!(author_label(Some("   ")), None);
        assert_eq!(author_label(Some(" Zed ")), Some("Z".to_string()));
        assert_eq!(author_label(Some("émile")), Some("é".to_string()));
    }

    #[test]
    fn test_reveal_labels() {
        assert_eq!(reveal_label(&answer("1", "human", Some("Q"))), "Q");
        assert_eq!(reveal_label(&answer("2", "human", None)), "User");
        assert_eq!(reveal_label(&answer("3", "gemini", None)), "GEMINI");
        assert_eq!(reveal_label(&answer("4", "qwen", None)), "QWEN");
        assert_eq!(reveal_label(&answer("5", "llama", None)), "LLAMA");
    }

    #[test]
    fn test_split_winner() {
        let answers = vec![answer("a", "human", None), answer("b", "qwen", None)];
        let (w, l) = split_winner(&answers, "b").unwrap();
        assert_eq!((w.id.as_str(), l.id.as_str()), ("b", "a"));
        let (w, l) = split_winner(&answers, "a").unwrap();
        assert_eq!((w.id.as_str(), l.id.as_str()), ("a", "b"));
        assert!(split_winner(&answers, "c").is_none());
        assert!(split_winner(&answers[..1], "a").is_none());
    }

    #[test]
    fn test_pick_pair_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let answers = vec![
                answer("a", "human", None),
                answer("b", "gemini", None),
                answer("c", "qwen", None),
            ];
            let (x, y) = pick_pair(answers, &mut rng).unwrap();
            assert_ne!(x.id, y.id);
        }
        assert!(pick_pair(vec![answer("a", "human", None)], &mut rng).is_none());
        assert!(pick_pair(Vec::new(), &mut rng).is_none());
    }
}
