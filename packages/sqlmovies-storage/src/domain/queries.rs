//! Stage 07 lesson: queries across tables
//!
//! Each query joins at least one junction table, aggregates, and fixes its
//! result order with `ORDER BY ... LIMIT n`.

/// Three directors whose movies carry the largest summed adjusted budget
pub const TOP_DIRECTORS_BY_BUDGET: &str = "SELECT
      round(SUM(budget_adjusted), 2) as total_budget,
      directors.full_name as director
      FROM movies
      JOIN movie_directors on movies.id = movie_directors.movie_id
      JOIN directors on directors.id = movie_directors.director_id
      GROUP by directors.full_name
      ORDER by total_budget DESC
      LIMIT 3";

/// Ten keywords attached to the most movies
pub const TOP_KEYWORDS: &str = "SELECT
      keyword, count(movie_keywords.keyword_id) as count
      FROM keywords
      JOIN movie_keywords on keywords.id = movie_keywords.keyword_id
      GROUP by keyword_id
      ORDER by count DESC
      LIMIT 10";

/// The movie with the most credited actors
pub const MOST_CREDITED_MOVIE: &str = "SELECT
      original_title, count(movie_actors.actor_id) as count
      FROM movies
      JOIN movie_actors on movies.id = movie_actors.movie_id
      GROUP by original_title
      ORDER by count DESC
      LIMIT 1";

/// Three genres with the most five-star ratings
pub const TOP_GENRES_BY_FIVE_STARS: &str = "SELECT
      genre, count(genre) as five_stars_count
      FROM genres
      JOIN movie_genres on movie_genres.genre_id = genres.id
      JOIN movie_ratings on movie_ratings.movie_id = movie_genres.movie_id
      WHERE movie_ratings.rating = 5
      GROUP by genre
      ORDER by five_stars_count DESC
      LIMIT 3";

/// Three genres with the highest average rating, two decimals
pub const TOP_GENRES_BY_AVERAGE_RATING: &str = "SELECT
      genre, round(avg(movie_ratings.rating), 2) as avg_rating
      FROM genres
      JOIN movie_genres on movie_genres.genre_id = genres.id
      JOIN movie_ratings on movie_ratings.movie_id = movie_genres.movie_id
      GROUP by genre
      ORDER by avg_rating DESC
      LIMIT 3";

/// Every stage 07 query with a short name, in lesson order
pub const ALL: &[(&str, &str)] = &[
    ("top_directors_by_budget", TOP_DIRECTORS_BY_BUDGET),
    ("top_keywords", TOP_KEYWORDS),
    ("most_credited_movie", MOST_CREDITED_MOVIE),
    ("top_genres_by_five_stars", TOP_GENRES_BY_FIVE_STARS),
    ("top_genres_by_average_rating", TOP_GENRES_BY_AVERAGE_RATING),
];

/// Look up a lesson query by its short name
pub fn by_name(name: &str) -> Option<&'static str> {
    ALL.iter().find(|(n, _)| *n == name).map(|(_, sql)| *sql)
}
