use fairway_api::v1::id::TournamentId;
use fairway_api::{Client, Error};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let host = args
        .next()
        .unwrap_or_else(|| String::from("http://localhost:8000"));

    let client = Client::new(host);

    let tournaments = client.tournaments().list().await.unwrap();
    println!("listed {} tournaments", tournaments.len());

    for tournament in &tournaments {
        let got = client.tournaments().get(tournament.id).await.unwrap();
        assert_eq!(&got, tournament);

        println!("{}: {}", got.id, got.name);
    }

    // An id outside the seed set must yield a 404.
    match client.tournaments().get(TournamentId(u64::MAX)).await {
        Err(Error::BadStatus(status)) => assert_eq!(status, 404),
        res => panic!("expected a 404, got {:?}", res),
    }

    println!("ok");
}
