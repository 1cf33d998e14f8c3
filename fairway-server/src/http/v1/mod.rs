mod tournament;

use crate::http::{Request, RequestUri, Result};
use crate::Error;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        Some("tournament") => tournament::route(req, uri).await,
        _ => Err(Error::NotFound),
    }
}
