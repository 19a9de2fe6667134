pub mod cat;
pub mod dat64;
pub mod extract;
pub mod index;
pub mod list;

use glob::{MatchOptions, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    One,
    Two,
}

impl std::str::FromStr for Patch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Patch::One),
            "2" => Ok(Patch::Two),
            _ => Err(format!("Unknown patch {s:?}, expected 1 or 2")),
        }
    }
}

/// True if any of the patterns match. Wildcards don't cross path separators.
pub fn matches_any(patterns: &[Pattern], path: &str) -> bool {
    patterns.iter().any(|pattern| {
        pattern.matches_with(
            path,
            MatchOptions {
                require_literal_separator: true,
                ..Default::default()
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use glob::Pattern;

    use super::{matches_any, Patch};

    #[test]
    fn patch_from_str() {
        assert_eq!("1".parse::<Patch>(), Ok(Patch::One));
        assert_eq!("2".parse::<Patch>(), Ok(Patch::Two));
        assert!("3.25".parse::<Patch>().is_err());
    }

    #[test]
    fn globs_stay_within_folders() {
        let patterns = [Pattern::new("data/*.dat64").unwrap()];

        assert!(matches_any(&patterns, "data/mods.dat64"));
        assert!(!matches_any(&patterns, "data/balance/mods.dat64"));
        assert!(!matches_any(&[], "data/mods.dat64"));
    }
}
