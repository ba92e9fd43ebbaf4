//! Statistical programs and their downloadable publications.
//!
//! The program list is embedded at compile time from `programs.toml`.
//! Each program is paired with the first storage object whose file name
//! resembles the program name.

use serde::Deserialize;
use statmap_server_models::ApiProgram;

/// Number of listed programs. Enforced by a test.
#[cfg(test)]
const EXPECTED_PROGRAM_COUNT: usize = 7;

const PROGRAMS_TOML: &str = include_str!("../programs.toml");

/// A program as configured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgramDefinition {
    /// Program name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct ProgramList {
    programs: Vec<ProgramDefinition>,
}

/// Returns the configured programs.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. It is a compile-time
/// constant, so a failure is a development error caught by the tests.
#[must_use]
pub fn all_programs() -> Vec<ProgramDefinition> {
    toml::de::from_str::<ProgramList>(PROGRAMS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse programs: {e}"))
        .programs
}

/// Lowercases and keeps only letters and digits.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// File name of a key without directories or extension.
fn file_stem(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Relative link that asks the server for a presigned URL.
#[must_use]
pub fn download_link(key: &str) -> Option<String> {
    let url = reqwest::Url::parse_with_params("http://localhost/api/download", &[("key", key)])
        .ok()?;
    Some(format!("{}?{}", url.path(), url.query()?))
}

/// Pairs each program with the first matching storage key.
///
/// A key matches when its normalized file stem contains the normalized
/// program name, or is contained in it while covering at least half of
/// the name. The second rule keeps short stems such as `survey` from
/// matching every program that mentions the word.
#[must_use]
pub fn match_programs(programs: &[ProgramDefinition], keys: &[String]) -> Vec<ApiProgram> {
    let stems: Vec<(String, &String)> = keys
        .iter()
        .map(|key| (normalize_name(file_stem(key)), key))
        .filter(|(stem, _)| !stem.is_empty())
        .collect();

    programs
        .iter()
        .map(|program| {
            let name = normalize_name(&program.name);
            let key = stems
                .iter()
                .find(|(stem, _)| {
                    stem.contains(&name)
                        || (stem.len() * 2 >= name.len() && name.contains(stem.as_str()))
                })
                .map(|(_, key)| (*key).clone());

            ApiProgram {
                name: program.name.clone(),
                description: program.description.clone(),
                download_url: key.as_deref().and_then(download_link),
                key,
            }
        })
        .collect()
}
