//! CAPTCHA resolution for cookie_captcha panels
//!
//! The panel serves its challenge as SVG. The pipeline rasterises it to PNG,
//! submits it to an image-to-text solver and polls at a fixed interval
//! until the answer is ready:
//!
//! ```text
//! Fetched -> Submitted -> Polling -> Solved | Failed | TimedOut
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use resvg::{tiny_skia, usvg};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{PanelError, PanelResult};

/// Solver reply while the worker has not answered yet
const NOT_READY: &str = "CAPCHA_NOT_READY";

lazy_static! {
    static ref DUP_WIDTH_REGEX: Regex =
        Regex::new(r#"(?i)(<svg[^>]*width="[^"]*"[^>]*)(width="[^"]*")"#).unwrap();
    static ref DUP_HEIGHT_REGEX: Regex =
        Regex::new(r#"(?i)(<svg[^>]*height="[^"]*"[^>]*)(height="[^"]*")"#).unwrap();
}

/// Answer from one poll of the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Ready(String),
    NotReady,
}

/// Image-to-text solving service
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Submit a base64 PNG, returning the solver's task id
    async fn submit(&self, png_base64: &str) -> PanelResult<String>;

    async fn poll(&self, task_id: &str) -> PanelResult<PollStatus>;
}

/// Pipeline states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeState {
    Fetched,
    Submitted { task_id: String },
    Polling { task_id: String, attempt: u32 },
    Solved(String),
    Failed(String),
    TimedOut { attempts: u32 },
}

impl ChallengeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChallengeState::Solved(_) | ChallengeState::Failed(_) | ChallengeState::TimedOut { .. }
        )
    }
}

pub struct CaptchaPipeline {
    solver: Arc<dyn CaptchaSolver>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl CaptchaPipeline {
    pub fn new(solver: Arc<dyn CaptchaSolver>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            solver,
            poll_interval,
            max_attempts,
        }
    }

    /// Drive one challenge to a terminal state
    pub async fn run(&self, svg: &str) -> ChallengeState {
        let mut state = ChallengeState::Fetched;

        loop {
            state = match state {
                ChallengeState::Fetched => {
                    let png = match svg_to_png(svg) {
                        Ok(png) => png,
                        Err(e) => return ChallengeState::Failed(e.to_string()),
                    };
                    match self.solver.submit(&STANDARD.encode(png)).await {
                        Ok(task_id) => {
                            debug!("Captcha submitted, task {}", task_id);
                            ChallengeState::Submitted { task_id }
                        }
                        Err(e) => ChallengeState::Failed(e.to_string()),
                    }
                }
                ChallengeState::Submitted { task_id } => ChallengeState::Polling {
                    task_id,
                    attempt: 0,
                },
                ChallengeState::Polling { task_id, attempt } => {
                    if attempt >= self.max_attempts {
                        ChallengeState::TimedOut { attempts: attempt }
                    } else {
                        sleep(self.poll_interval).await;
                        match self.solver.poll(&task_id).await {
                            Ok(PollStatus::Ready(answer)) => ChallengeState::Solved(answer),
                            Ok(PollStatus::NotReady) => ChallengeState::Polling {
                                task_id,
                                attempt: attempt + 1,
                            },
                            Err(e) => ChallengeState::Failed(e.to_string()),
                        }
                    }
                }
                terminal => return terminal,
            };

            if state.is_terminal() {
                return state;
            }
        }
    }

    /// Resolve a challenge to its text, mapping non-solved states to `Challenge`
    pub async fn solve(&self, svg: &str) -> PanelResult<String> {
        match self.run(svg).await {
            ChallengeState::Solved(answer) => {
                info!("Captcha solved");
                Ok(answer)
            }
            ChallengeState::Failed(reason) => {
                warn!("Captcha failed: {}", reason);
                Err(PanelError::Challenge(reason))
            }
            ChallengeState::TimedOut { attempts } => {
                warn!("Captcha not solved after {} polls", attempts);
                Err(PanelError::Challenge(format!(
                    "solver did not answer after {} polls",
                    attempts
                )))
            }
            other => Err(PanelError::Challenge(format!(
                "pipeline stopped in state {:?}",
                other
            ))),
        }
    }
}

/// Drop duplicated width/height attributes on the root element, which the
/// panel emits and strict SVG parsers reject
pub fn clean_svg(svg: &str) -> String {
    let without_width = DUP_WIDTH_REGEX.replace_all(svg, "$1");
    DUP_HEIGHT_REGEX
        .replace_all(&without_width, "$1")
        .into_owned()
}

/// Rasterise the challenge SVG to PNG bytes
pub fn svg_to_png(svg: &str) -> PanelResult<Vec<u8>> {
    let cleaned = clean_svg(svg);
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(&cleaned, &options)
        .map_err(|e| PanelError::Challenge(format!("invalid challenge svg: {}", e)))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| PanelError::Challenge("challenge svg has zero size".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| PanelError::Challenge(format!("png encoding failed: {}", e)))
}

#[derive(Debug, Deserialize)]
struct SolverReply {
    status: i64,
    request: String,
}

/// 2Captcha-compatible HTTP solver
pub struct TwoCaptchaSolver {
    http: Client,
    base_url: String,
    api_key: RwLock<String>,
}

impl TwoCaptchaSolver {
    pub fn new(http: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: RwLock::new(api_key.to_string()),
        }
    }

    /// Replace the API key, e.g. after an operator changed it
    pub fn set_api_key(&self, key: &str) {
        if let Ok(mut guard) = self.api_key.write() {
            *guard = key.to_string();
        }
    }

    fn api_key(&self) -> String {
        self.api_key
            .read()
            .map(|k| k.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CaptchaSolver for TwoCaptchaSolver {
    async fn submit(&self, png_base64: &str) -> PanelResult<String> {
        let key = self.api_key();
        if key.is_empty() {
            return Err(PanelError::Challenge("captcha solver API key not configured".to_string()));
        }

        let reply: SolverReply = self
            .http
            .post(format!("{}/in.php", self.base_url))
            .form(&[
                ("key", key.as_str()),
                ("method", "base64"),
                ("body", png_base64),
                ("numeric", "2"),
                ("min_len", "2"),
                ("max_len", "2"),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PanelError::Challenge(format!("unreadable solver reply: {}", e)))?;

        if reply.status != 1 {
            return Err(PanelError::Challenge(format!(
                "submission rejected: {}",
                reply.request
            )));
        }
        Ok(reply.request)
    }

    async fn poll(&self, task_id: &str) -> PanelResult<PollStatus> {
        let key = self.api_key();
        let reply: SolverReply = self
            .http
            .get(format!("{}/res.php", self.base_url))
            .query(&[
                ("key", key.as_str()),
                ("action", "get"),
                ("id", task_id),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PanelError::Challenge(format!("unreadable solver reply: {}", e)))?;

        if reply.status == 1 {
            Ok(PollStatus::Ready(reply.request))
        } else if reply.request == NOT_READY {
            Ok(PollStatus::NotReady)
        } else {
            Err(PanelError::Challenge(format!("solver error: {}", reply.request)))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::spawn_panel;
    use axum::{extract::Query, routing::get, routing::post, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    pub const TEST_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="150" height="50" viewBox="0,0,150,50"><rect width="150" height="50" fill="#fff"/><path d="M10 10 L40 40" stroke="#000"/></svg>"##;

    /// Answers from a fixed script, counting polls
    pub struct ScriptedSolver {
        pub submit_result: Mutex<Option<PanelResult<String>>>,
        pub replies: Mutex<Vec<PanelResult<PollStatus>>>,
        pub polls: AtomicU32,
    }

    impl ScriptedSolver {
        pub fn new(replies: Vec<PanelResult<PollStatus>>) -> Self {
            Self {
                submit_result: Mutex::new(None),
                replies: Mutex::new(replies),
                polls: AtomicU32::new(0),
            }
        }

        pub fn always_solves(answer: &str) -> Self {
            Self::new(vec![Ok(PollStatus::Ready(answer.to_string()))])
        }
    }

    #[async_trait]
    impl CaptchaSolver for ScriptedSolver {
        async fn submit(&self, png_base64: &str) -> PanelResult<String> {
            assert!(!png_base64.is_empty());
            match self.submit_result.lock().unwrap().take() {
                Some(result) => result,
                None => Ok("task-1".to_string()),
            }
        }

        async fn poll(&self, _task_id: &str) -> PanelResult<PollStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(PollStatus::NotReady)
            } else {
                replies.remove(0)
            }
        }
    }

    fn pipeline(solver: Arc<ScriptedSolver>, max_attempts: u32) -> CaptchaPipeline {
        CaptchaPipeline::new(solver, Duration::ZERO, max_attempts)
    }

    #[test]
    fn test_clean_svg_drops_duplicate_dimensions() {
        let svg = r#"<svg width="150" height="50" viewBox="0,0,150,50" width="150" height="50"><path d="M0 0"/></svg>"#;
        let cleaned = clean_svg(svg);
        assert_eq!(cleaned.matches("width=").count(), 1);
        assert_eq!(cleaned.matches("height=").count(), 1);
        assert!(cleaned.contains("viewBox"));
    }

    #[test]
    fn test_svg_to_png_produces_png() {
        let png = svg_to_png(TEST_SVG).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_invalid_svg_is_challenge_error() {
        assert!(matches!(svg_to_png("not svg"), Err(PanelError::Challenge(_))));
    }

    #[tokio::test]
    async fn test_solved_after_not_ready() {
        let solver = Arc::new(ScriptedSolver::new(vec![
            Ok(PollStatus::NotReady),
            Ok(PollStatus::NotReady),
            Ok(PollStatus::Ready("42".to_string())),
        ]));
        let state = pipeline(solver.clone(), 30).run(TEST_SVG).await;
        assert_eq!(state, ChallengeState::Solved("42".to_string()));
        assert_eq!(solver.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_without_extra_polls() {
        let solver = Arc::new(ScriptedSolver::new(Vec::new()));
        let state = pipeline(solver.clone(), 5).run(TEST_SVG).await;
        assert_eq!(state, ChallengeState::TimedOut { attempts: 5 });
        assert_eq!(solver.polls.load(Ordering::SeqCst), 5);

        let err = pipeline(solver.clone(), 5).solve(TEST_SVG).await.unwrap_err();
        assert!(matches!(err, PanelError::Challenge(_)));
    }

    #[tokio::test]
    async fn test_rejection_fails_immediately() {
        let solver = Arc::new(ScriptedSolver::new(vec![
            Ok(PollStatus::NotReady),
            Err(PanelError::Challenge("ERROR_CAPTCHA_UNSOLVABLE".to_string())),
            Ok(PollStatus::Ready("never".to_string())),
        ]));
        let state = pipeline(solver.clone(), 30).run(TEST_SVG).await;
        assert!(matches!(state, ChallengeState::Failed(ref r) if r.contains("UNSOLVABLE")));
        assert_eq!(solver.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_rejection_never_polls() {
        let solver = Arc::new(ScriptedSolver::new(Vec::new()));
        *solver.submit_result.lock().unwrap() =
            Some(Err(PanelError::Challenge("ERROR_ZERO_BALANCE".to_string())));
        let state = pipeline(solver.clone(), 30).run(TEST_SVG).await;
        assert!(matches!(state, ChallengeState::Failed(_)));
        assert_eq!(solver.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_captcha_protocol() {
        let polls = Arc::new(AtomicU32::new(0));
        let polls_in_handler = polls.clone();
        let router = Router::new()
            .route(
                "/in.php",
                post(|| async { Json(serde_json::json!({ "status": 1, "request": "777" })) }),
            )
            .route(
                "/res.php",
                get(move |Query(q): Query<HashMap<String, String>>| {
                    let polls = polls_in_handler.clone();
                    async move {
                        assert_eq!(q.get("id").map(String::as_str), Some("777"));
                        assert_eq!(q.get("key").map(String::as_str), Some("k"));
                        if polls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Json(serde_json::json!({ "status": 0, "request": NOT_READY }))
                        } else {
                            Json(serde_json::json!({ "status": 1, "request": "58" }))
                        }
                    }
                }),
            );
        let base = spawn_panel(router).await;

        let solver = TwoCaptchaSolver::new(Client::new(), &base, "k");
        assert_eq!(solver.submit("aGVsbG8=").await.unwrap(), "777");
        assert_eq!(solver.poll("777").await.unwrap(), PollStatus::NotReady);
        assert_eq!(
            solver.poll("777").await.unwrap(),
            PollStatus::Ready("58".to_string())
        );
    }

    #[tokio::test]
    async fn test_two_captcha_requires_key() {
        let solver = TwoCaptchaSolver::new(Client::new(), "http://127.0.0.1:9", "");
        assert!(matches!(
            solver.submit("aGVsbG8=").await,
            Err(PanelError::Challenge(_))
        ));
    }
}
