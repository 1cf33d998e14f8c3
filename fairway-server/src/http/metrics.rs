use hyper::Method;

use crate::http::{Request, RequestUri, Response, Result};
use crate::method;
use crate::Error;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        None => method!(req, {
            Method::GET => get(req).await,
        }),
        _ => Err(Error::NotFound),
    }
}

async fn get(req: Request) -> Result {
    let body = req.state().metrics.serialize();

    Ok(Response::ok().body(body))
}
