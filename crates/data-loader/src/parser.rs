//! Parser for MovieLens data files.
//!
//! - movies.dat: movieId::title::genres
//! - ratings.dat: userId::movieId::rating::timestamp
//!
//! A line with fewer fields than its format requires is a fatal error, as is
//! a field that does not parse. Blank lines are skipped.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Placeholder MovieLens uses for movies without any genre
const NO_GENRES: &str = "(no genres listed)";

/// Helper function to read a file with ISO-8859-1 encoding (Latin-1)
///
/// The MovieLens dataset uses ISO-8859-1 encoding, not UTF-8.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    // Each Latin-1 byte maps directly to a Unicode code point
    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Split a line on `::` and require at least `expected` fields
fn split_fields<'a>(
    line: &'a str,
    expected: usize,
    file: &str,
    line_no: usize,
) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = line.split("::").collect();
    if parts.len() < expected {
        return Err(DataLoadError::FieldCountMismatch {
            file: file.to_string(),
            expected,
            found: parts.len(),
            line: line_no,
        });
    }
    Ok(parts)
}

fn parse_field<T>(value: &str, name: &str, file: &str, line_no: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason: format!("Invalid {}: {}", name, e),
    })
}

/// Parse the movies.dat file
///
/// The title often includes year in parentheses: "Toy Story (1995)"
/// Genres are pipe-separated: "Animation|Children's|Comedy"
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let lines = read_lines_latin1(path)?;
    parse_movie_lines(&lines, "movies.dat")
}

pub(crate) fn parse_movie_lines(lines: &[String], file: &str) -> Result<Vec<Movie>> {
    let mut movies = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let parts = split_fields(line_trimmed, 3, file, line_no)?;
        let title = parts[1];

        movies.push(Movie {
            id: parse_field(parts[0], "movieId", file, line_no)?,
            title: title.to_string(),
            year: extract_year_from_title(title),
            genres: parse_genres(parts[2])?,
        });
    }
    Ok(movies)
}

/// Parse the ratings.dat file
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let lines = read_lines_latin1(path)?;
    parse_rating_lines(&lines, "ratings.dat")
}

pub(crate) fn parse_rating_lines(lines: &[String], file: &str) -> Result<Vec<Rating>> {
    let mut ratings = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let parts = split_fields(line_trimmed, 4, file, line_no)?;

        ratings.push(Rating {
            user_id: parse_field(parts[0], "userId", file, line_no)?,
            movie_id: parse_field(parts[1], "movieId", file, line_no)?,
            rating: parse_field(parts[2], "rating", file, line_no)?,
            timestamp: parse_field(parts[3], "timestamp", file, line_no)?,
        });
    }
    Ok(ratings)
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        return title[start + 1..end].parse::<u16>().ok();
    }
    None
}

/// Parse a genre label into the Genre enum
fn parse_genre(s: &str) -> Result<Genre> {
    Genre::from_label(s.trim()).ok_or_else(|| DataLoadError::InvalidValue {
        field: "genre".to_string(),
        value: s.to_string(),
    })
}

/// Parse pipe-separated genres
///
/// Example: "Action|Adventure|Sci-Fi" -> vec![Genre::Action, Genre::Adventure, Genre::SciFi]
fn parse_genres(s: &str) -> Result<Vec<Genre>> {
    let mut genres = Vec::new();
    for genre_str in s.split('|') {
        if genre_str.trim() == NO_GENRES {
            continue;
        }
        let genre = parse_genre(genre_str)?;
        if !genres.contains(&genre) {
            genres.push(genre);
        }
    }
    Ok(genres)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year_from_title("Toy Story (1995)"), Some(1995));
        assert_eq!(extract_year_from_title("Movie Title"), None);
    }

    #[test]
    fn test_parse_genre() {
        assert!(matches!(parse_genre("Action").unwrap(), Genre::Action));
        assert!(matches!(parse_genre("Children's").unwrap(), Genre::Children));
        assert!(parse_genre("Bollywood").is_err());
    }

    #[test]
    fn test_no_genres_listed() {
        assert!(parse_genres("(no genres listed)").unwrap().is_empty());
    }

    #[test]
    fn test_parse_movie_lines() {
        let movies = parse_movie_lines(
            &lines(&[
                "1::Toy Story (1995)::Animation|Children's|Comedy",
                "",
                "2::Jumanji (1995)::Adventure|Children's|Fantasy",
            ]),
            "movies.dat",
        )
        .unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].genres, vec![Genre::Animation, Genre::Children, Genre::Comedy]);
        assert_eq!(movies[1].year, Some(1995));
    }

    #[test]
    fn test_parse_rating_lines_with_half_stars() {
        let ratings =
            parse_rating_lines(&lines(&["1::31::2.5::1260759144"]), "ratings.dat").unwrap();
        assert_eq!(ratings[0].user_id, 1);
        assert_eq!(ratings[0].movie_id, 31);
        assert_eq!(ratings[0].rating, 2.5);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let err = parse_rating_lines(&lines(&["1::31::2.5"]), "ratings.dat").unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::FieldCountMismatch {
                expected: 4,
                found: 3,
                line: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let err = parse_rating_lines(
            &lines(&["1::31::2.5::1", "x::1::3::1"]),
            "ratings.dat",
        )
        .unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_movies(Path::new("/definitely/not/here/movies.dat")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
