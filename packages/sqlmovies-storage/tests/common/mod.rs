//! Shared fixtures for the integration suites
//!
//! `seed_stage_06` writes a small, deterministic lesson database whose
//! aggregates line up with the stage 07 expectations: director budget
//! totals, keyword counts, credited actors and genre ratings.

#![allow(dead_code)]

use serde_json::{json, Value};
use sqlmovies_storage::{schema, SqliteDatabase, StoreConfig};
use tempfile::TempDir;

/// Directors and the adjusted budgets of the movies they directed
pub const DIRECTORS: &[(&str, &[(&str, f64)])] = &[
    (
        "Ridley Scott",
        &[
            ("Gladiator", 137435897.58),
            ("Prometheus", 130000000.0),
            ("Kingdom of Heaven", 455446246.0),
        ],
    ),
    (
        "Michael Bay",
        &[("Armageddon", 200000000.0), ("Pearl Harbor", 318297522.1)],
    ),
    (
        "David Yates",
        &[
            ("Harry Potter and the Order of the Phoenix", 250000000.0),
            ("Harry Potter and the Half-Blood Prince", 254100108.5),
        ],
    ),
    (
        "Christopher Nolan",
        &[("Inception", 160000000.0), ("Interstellar", 165000000.0)],
    ),
    ("Kathryn Bigelow", &[("The Hurt Locker", 15000000.0)]),
];

/// Movies nobody in `DIRECTORS` directed
pub const UNDIRECTED: &[&str] = &[
    "Life",
    "The Departed",
    "Whiplash",
    "Bowling for Columbine",
    "Superbad",
];

/// Keywords and how many filler movies carry each
pub const KEYWORDS: &[(&str, usize)] = &[
    ("woman director", 162),
    ("independent film", 115),
    ("based on novel", 85),
    ("duringcreditsstinger", 82),
    ("biography", 78),
    ("murder", 66),
    ("sex", 60),
    ("revenge", 51),
    ("sport", 50),
    ("high school", 48),
    ("friendship", 47),
    ("dystopia", 30),
    ("love", 12),
];

pub const FILLER_MOVIES: usize = 200;
const FILLER_FIRST_ID: i64 = 101;

/// Genre, rated movie, five-star ratings, one-star ratings
pub const GENRE_RATINGS: &[(&str, Option<&str>, usize, usize)] = &[
    ("Drama", Some("Gladiator"), 15052, 10000),
    ("Thriller", Some("Prometheus"), 11771, 8000),
    ("Crime", Some("The Departed"), 8670, 3760),
    ("Music", Some("Whiplash"), 300, 140),
    ("Documentary", Some("Bowling for Columbine"), 200, 95),
    ("Comedy", Some("Superbad"), 1000, 2000),
    ("Action", Some("Armageddon"), 500, 500),
    ("Romance", None, 0, 0),
];

/// Genres of movies without ratings; they never reach the rating joins
pub const UNRATED_GENRES: &[(&str, &str)] = &[("Life", "Thriller"), ("Inception", "Action")];

/// Credited actors per movie; "Life" has the longest cast
pub const CASTS: &[(&str, usize)] = &[
    ("Life", 12),
    ("Inception", 10),
    ("Gladiator", 9),
    ("Interstellar", 7),
    ("The Departed", 8),
];

const ACTOR_POOL: usize = 40;

/// One test suite's stage 07 handle and the directory that holds it
///
/// Dropping the suite deletes every snapshot it created.
pub struct Suite {
    pub db: SqliteDatabase,
    pub config: StoreConfig,
    dir: TempDir,
}

impl Suite {
    /// Seed stage 06 in a fresh directory and load stage 07 from it
    pub async fn setup() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let config = StoreConfig::in_dir(dir.path());
        seed_stage_06(&config).await;

        let db = SqliteDatabase::from_existing(&config, "06", "07")
            .await
            .expect("stage 07 from stage 06");

        Self { db, config, dir }
    }

    pub async fn teardown(self) {
        self.db.close().await.expect("close stage 07");
    }
}

/// Build the stage 06 snapshot under `config.snapshot_dir`
pub async fn seed_stage_06(config: &StoreConfig) {
    let db = SqliteDatabase::create(config, "06").await.expect("create stage 06");
    schema::apply(&db).await.expect("schema");

    let titles = movie_titles();
    let movie_id = |title: &str| -> i64 {
        titles
            .iter()
            .position(|t| t == title)
            .map(|i| i as i64 + 1)
            .unwrap_or_else(|| panic!("unknown movie {}", title))
    };

    // movies: named titles first, then the filler block at FILLER_FIRST_ID
    let mut movies = Vec::new();
    for (index, title) in titles.iter().enumerate() {
        movies.push(vec![
            json!(index as i64 + 1),
            json!(title),
            budget_of(title).map_or(Value::Null, |b| json!(b)),
        ]);
    }
    for n in 0..FILLER_MOVIES {
        movies.push(vec![
            json!(FILLER_FIRST_ID + n as i64),
            json!(format!("Feature {:03}", n + 1)),
            json!(1000000.0 + n as f64),
        ]);
    }
    insert(&db, "movies", &["id", "original_title", "budget_adjusted"], movies).await;

    // directors
    let directors = DIRECTORS
        .iter()
        .enumerate()
        .map(|(i, (name, _))| vec![json!(i as i64 + 1), json!(name)])
        .collect();
    insert(&db, "directors", &["id", "full_name"], directors).await;

    let mut movie_directors = Vec::new();
    for (i, (_, movies)) in DIRECTORS.iter().enumerate() {
        for (title, _) in movies.iter() {
            movie_directors.push(vec![json!(movie_id(title)), json!(i as i64 + 1)]);
        }
    }
    insert(&db, "movie_directors", &["movie_id", "director_id"], movie_directors).await;

    // actors
    let actors = (1..=ACTOR_POOL)
        .map(|i| vec![json!(i as i64), json!(format!("Actor {:02}", i))])
        .collect();
    insert(&db, "actors", &["id", "full_name"], actors).await;

    let mut movie_actors = Vec::new();
    for (offset, (title, cast)) in CASTS.iter().enumerate() {
        for k in 0..*cast {
            let actor = (offset * 3 + k) % ACTOR_POOL + 1;
            movie_actors.push(vec![json!(movie_id(title)), json!(actor as i64)]);
        }
    }
    for n in 0..50 {
        for k in 0..3 {
            let actor = (n + k * 7) % ACTOR_POOL + 1;
            movie_actors.push(vec![json!(FILLER_FIRST_ID + n as i64), json!(actor as i64)]);
        }
    }
    insert(&db, "movie_actors", &["movie_id", "actor_id"], movie_actors).await;

    // keywords
    let keywords = KEYWORDS
        .iter()
        .enumerate()
        .map(|(i, (keyword, _))| vec![json!(i as i64 + 1), json!(keyword)])
        .collect();
    insert(&db, "keywords", &["id", "keyword"], keywords).await;

    let mut movie_keywords = Vec::new();
    for (i, (_, count)) in KEYWORDS.iter().enumerate() {
        for n in 0..*count {
            movie_keywords.push(vec![json!(FILLER_FIRST_ID + n as i64), json!(i as i64 + 1)]);
        }
    }
    insert(&db, "movie_keywords", &["movie_id", "keyword_id"], movie_keywords).await;

    // genres and ratings
    let genre_id = |name: &str| -> i64 {
        GENRE_RATINGS
            .iter()
            .position(|(g, ..)| *g == name)
            .map(|i| i as i64 + 1)
            .unwrap_or_else(|| panic!("unknown genre {}", name))
    };
    let genres = GENRE_RATINGS
        .iter()
        .map(|(genre, ..)| vec![json!(genre_id(genre)), json!(genre)])
        .collect();
    insert(&db, "genres", &["id", "genre"], genres).await;

    let mut movie_genres = Vec::new();
    let mut ratings = Vec::new();
    for (genre, movie, fives, ones) in GENRE_RATINGS {
        let Some(title) = movie else { continue };
        let movie = movie_id(title);
        movie_genres.push(vec![json!(movie), json!(genre_id(genre))]);
        for user in 1..=(fives + ones) {
            let rating = if user <= *fives { 5.0 } else { 1.0 };
            ratings.push(vec![json!(user as i64), json!(movie), json!(rating)]);
        }
    }
    for (title, genre) in UNRATED_GENRES {
        movie_genres.push(vec![json!(movie_id(title)), json!(genre_id(genre))]);
    }
    insert(&db, "movie_genres", &["movie_id", "genre_id"], movie_genres).await;
    insert(&db, "movie_ratings", &["user_id", "movie_id", "rating"], ratings).await;

    db.close().await.expect("close stage 06");
}

async fn insert(db: &SqliteDatabase, table: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
    db.insert_rows(table, columns, rows)
        .await
        .unwrap_or_else(|e| panic!("seeding {} failed: {}", table, e));
}

fn movie_titles() -> Vec<String> {
    DIRECTORS
        .iter()
        .flat_map(|(_, movies)| movies.iter().map(|(title, _)| title.to_string()))
        .chain(UNDIRECTED.iter().map(|t| t.to_string()))
        .collect()
}

fn budget_of(title: &str) -> Option<f64> {
    DIRECTORS
        .iter()
        .flat_map(|(_, movies)| movies.iter())
        .find(|(t, _)| *t == title)
        .map(|(_, budget)| *budget)
}
