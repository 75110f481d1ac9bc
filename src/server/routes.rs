//! HTTP routes
//!
//! ```text
//! POST /api/startMatch        start the simulator, {"ok":true}
//! GET  /api/score             current snapshot
//! GET  /api/score/long        long-poll for a version newer than `since`
//! GET  /api/score/sse         event stream of updates
//! GET  /ws                    WebSocket stream of updates, echoes text
//! GET  /api/stats             hub counters
//! ```
//!
//! Every read route takes an optional `matchId` query parameter.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use warp::http::Method;
use warp::{Filter, Rejection, Reply};

use crate::hub::BroadcastHub;
use crate::server::config::ServerConfig;
use crate::server::push;
use crate::server::query::{self, Ack, MatchQuery};
use crate::simulator::MatchSimulator;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub simulator: Arc<MatchSimulator>,
    pub config: ServerConfig,
}

impl AppState {
    fn match_query(&self, params: &HashMap<String, String>) -> MatchQuery {
        MatchQuery::from_params(params, &self.hub.config().default_match_id)
    }
}

/// All routes, with CORS and request tracing applied
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec!["content-type"]);

    start_match(state.clone())
        .or(score(state.clone()))
        .or(score_long(state.clone()))
        .or(score_sse(state.clone()))
        .or(stats(state.clone()))
        .or(socket(state))
        .with(cors)
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn match_params() -> impl Filter<Extract = (HashMap<String, String>,), Error = Rejection> + Clone {
    warp::query::<HashMap<String, String>>()
}

fn start_match(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "startMatch")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state))
        .map(|body: Bytes, state: AppState| {
            let match_id = query::start_match_id(&body, &state.hub.config().default_match_id);
            state.simulator.start(&match_id);
            warp::reply::json(&Ack::OK)
        })
}

fn score(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "score")
        .and(warp::get())
        .and(match_params())
        .and(with_state(state))
        .map(|params: HashMap<String, String>, state: AppState| {
            let q = state.match_query(&params);
            warp::reply::json(&*state.hub.snapshot(&q.match_id))
        })
}

fn score_long(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "score" / "long")
        .and(warp::get())
        .and(match_params())
        .and(with_state(state))
        .and_then(|params: HashMap<String, String>, state: AppState| async move {
            let q = state.match_query(&params);
            let response = state.hub.long_poll(&q.match_id, q.since).await;
            Ok::<_, Infallible>(warp::reply::json(&*response.update))
        })
}

fn score_sse(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "score" / "sse")
        .and(warp::get())
        .and(match_params())
        .and(with_state(state))
        .map(|params: HashMap<String, String>, state: AppState| {
            let q = state.match_query(&params);
            tracing::debug!(match_id = %q.match_id, "SSE client connected");

            let events = push::event_stream(Arc::clone(&state.hub), q.match_id);
            warp::sse::reply(
                warp::sse::keep_alive()
                    .interval(state.config.sse_keep_alive)
                    .stream(events),
            )
        })
}

fn socket(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(match_params())
        .and(with_state(state))
        .map(|ws: warp::ws::Ws, params: HashMap<String, String>, state: AppState| {
            let q = state.match_query(&params);
            let hub = Arc::clone(&state.hub);
            ws.max_message_size(state.config.ws_max_message_size)
                .on_upgrade(move |socket| push::serve_socket(socket, hub, q.match_id))
        })
}

fn stats(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_state(state))
        .map(|state: AppState| warp::reply::json(&state.hub.stats()))
}
