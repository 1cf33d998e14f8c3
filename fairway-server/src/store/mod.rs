use fairway_api::v1::id::TournamentId;
use fairway_api::v1::tournaments::Tournament;

/// The authoritative collection of tournaments.
///
/// The collection is built once at startup and never mutated afterwards, so
/// concurrent readers need no synchronization. There is exactly one state:
/// populated.
#[derive(Clone, Debug)]
pub struct Store {
    tournaments: Vec<Tournament>,
}

impl Store {
    pub fn new(tournaments: Vec<Tournament>) -> Self {
        Self { tournaments }
    }

    /// Returns all tournaments in insertion order.
    #[inline]
    pub fn list(&self) -> &[Tournament] {
        &self.tournaments
    }

    /// Returns the first tournament with the given `id`.
    ///
    /// Ids are unique by convention only. If the seed data contains
    /// duplicates the first match wins.
    pub fn get(&self, id: TournamentId) -> Option<&Tournament> {
        self.tournaments.iter().find(|tournament| tournament.id == id)
    }
}

/// The records served for the lifetime of the process.
pub fn seed() -> Vec<Tournament> {
    vec![
        Tournament {
            id: TournamentId(1),
            name: String::from("First Tournament"),
            start_date_time: 234234234234,
            end_date_time: 2342134234234,
            number_of_holes: 18,
            minimum_competitors_per_session: 1,
            description: String::from("Some Test dEscrption"),
        },
        Tournament {
            id: TournamentId(2),
            name: String::from("Another Tournament"),
            start_date_time: 123123123,
            end_date_time: 123123123,
            number_of_holes: 18,
            minimum_competitors_per_session: 3,
            description: String::from("asdasdasd"),
        },
    ]
}
