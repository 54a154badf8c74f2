//! Lesson database schema
//!
//! Entity tables (`movies`, `directors`, `actors`, `keywords`, `genres`) plus
//! the junction tables the cross-table lessons join through. `movie_ratings`
//! holds one row per user rating on a 0.5 to 5 scale.

use super::QueryExecutor;
use crate::Result;

pub const MOVIES: &str = "CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY,
    imdb_id TEXT,
    popularity REAL,
    budget INTEGER,
    budget_adjusted REAL,
    revenue INTEGER,
    revenue_adjusted REAL,
    original_title TEXT NOT NULL,
    homepage TEXT,
    tagline TEXT,
    overview TEXT,
    runtime INTEGER,
    release_date TEXT
)";

pub const DIRECTORS: &str = "CREATE TABLE IF NOT EXISTS directors (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE
)";

pub const ACTORS: &str = "CREATE TABLE IF NOT EXISTS actors (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE
)";

pub const KEYWORDS: &str = "CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY,
    keyword TEXT NOT NULL UNIQUE
)";

pub const GENRES: &str = "CREATE TABLE IF NOT EXISTS genres (
    id INTEGER PRIMARY KEY,
    genre TEXT NOT NULL UNIQUE
)";

pub const MOVIE_DIRECTORS: &str = "CREATE TABLE IF NOT EXISTS movie_directors (
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    director_id INTEGER NOT NULL REFERENCES directors(id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, director_id)
)";

pub const MOVIE_ACTORS: &str = "CREATE TABLE IF NOT EXISTS movie_actors (
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    actor_id INTEGER NOT NULL REFERENCES actors(id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, actor_id)
)";

pub const MOVIE_KEYWORDS: &str = "CREATE TABLE IF NOT EXISTS movie_keywords (
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, keyword_id)
)";

pub const MOVIE_GENRES: &str = "CREATE TABLE IF NOT EXISTS movie_genres (
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, genre_id)
)";

pub const MOVIE_RATINGS: &str = "CREATE TABLE IF NOT EXISTS movie_ratings (
    user_id INTEGER NOT NULL,
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    rating REAL NOT NULL CHECK (rating BETWEEN 0.5 AND 5),
    time_created TEXT,
    PRIMARY KEY (user_id, movie_id)
)";

/// Reverse lookups for the junction tables; the primary keys already cover
/// the `movie_id` side
pub const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS movie_directors_director_id_idx ON movie_directors (director_id)",
    "CREATE INDEX IF NOT EXISTS movie_actors_actor_id_idx ON movie_actors (actor_id)",
    "CREATE INDEX IF NOT EXISTS movie_keywords_keyword_id_idx ON movie_keywords (keyword_id)",
    "CREATE INDEX IF NOT EXISTS movie_genres_genre_id_idx ON movie_genres (genre_id)",
    "CREATE INDEX IF NOT EXISTS movie_ratings_movie_id_idx ON movie_ratings (movie_id)",
];

/// Tables in creation order (referenced tables first)
pub const TABLES: &[(&str, &str)] = &[
    ("movies", MOVIES),
    ("directors", DIRECTORS),
    ("actors", ACTORS),
    ("keywords", KEYWORDS),
    ("genres", GENRES),
    ("movie_directors", MOVIE_DIRECTORS),
    ("movie_actors", MOVIE_ACTORS),
    ("movie_keywords", MOVIE_KEYWORDS),
    ("movie_genres", MOVIE_GENRES),
    ("movie_ratings", MOVIE_RATINGS),
];

/// Full schema as one script
pub fn script() -> String {
    TABLES
        .iter()
        .map(|(_, ddl)| *ddl)
        .chain(INDEXES.iter().copied())
        .map(|stmt| format!("{};\n", stmt))
        .collect()
}

/// Create every lesson table and index; safe to run on a populated snapshot
pub async fn apply(db: &dyn QueryExecutor) -> Result<()> {
    db.execute_batch(&script()).await
}
