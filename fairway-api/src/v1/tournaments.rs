use serde::{Deserialize, Serialize};

use super::id::TournamentId;
use crate::{Client, Error, Result};

/// A single scheduled tournament.
///
/// The wire format uses camelCase field names (`startDateTime`,
/// `numberOfHoles`, ...), matching what every deployed consumer expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Epoch-like timestamp. Never validated against `end_date_time`.
    pub start_date_time: i64,
    pub end_date_time: i64,
    pub number_of_holes: u32,
    pub minimum_competitors_per_session: u32,
    pub description: String,
}

pub struct TournamentsClient<'a> {
    client: &'a Client,
}

impl<'a> TournamentsClient<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Returns all tournaments.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server responds with a
    /// non-2xx status code.
    pub async fn list(&self) -> Result<Vec<Tournament>> {
        let req = self.client.request().uri("/api/v1/tournament").build();

        let resp = self.client.send(req).await?;
        if !resp.is_success() {
            return Err(Error::BadStatus(resp.status()));
        }

        resp.json().await
    }

    /// Returns the [`Tournament`] with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no tournament with the given
    /// `id` exists.
    pub async fn get(&self, id: TournamentId) -> Result<Tournament> {
        let req = self
            .client
            .request()
            .uri(&format!("/api/v1/tournament/{}", id))
            .build();

        let resp = self.client.send(req).await?;
        if !resp.is_success() {
            return Err(Error::BadStatus(resp.status()));
        }

        resp.json().await
    }
}
