use fairway_api::v1::id::TournamentId;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::Method;

use crate::http::{Request, RequestUri, Response, Result};
use crate::method;
use crate::Error;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::GET => list(req).await,
        }),
        Some(part) => {
            let id: TournamentId = part.parse()?;

            match uri.take_str() {
                None => method!(req, {
                    Method::GET => get(req, id).await,
                }),
                Some(_) => Err(Error::NotFound),
            }
        }
    }
}

async fn list(req: Request) -> Result {
    let tournaments = req.state().store.list();

    let body = serde_json::to_vec(tournaments)?;

    Ok(Response::ok()
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body))
}

/// Returns the first matching tournament, or a 404 once the scan is
/// exhausted. A match short-circuits, exactly one status and body are
/// written per request.
async fn get(req: Request, id: TournamentId) -> Result {
    let tournament = req.state().store.get(id).ok_or(Error::NotFound)?;

    let body = serde_json::to_vec(tournament)?;

    Ok(Response::ok()
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body))
}
