// Random
use rand::prelude::IndexedRandom;

use log::trace;

/// Default alphabet for generated network names.
pub const NAME_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";
/// Default length of each half of a generated name.
pub const NAME_SIZE: usize = 10;

/*
* Generate a random network name:
* two substrings of `size` chars joined with an underscore.
* Falls back to lowercase ascii plus digits when no charset is given.
*/
pub fn name_generator(size: usize, charset: Option<&str>) -> String {
    let chars: Vec<char> = match charset {
        Some(set) if !set.is_empty() => set.chars().collect(),
        _ => NAME_CHARSET.chars().collect(),
    };

    let mut rng = rand::rng();
    let mut substring = || -> String {
        (0..size)
            .filter_map(|_| chars.choose(&mut rng))
            .collect()
    };
    let res = format!("{}_{}", substring(), substring());

    trace!("generated network name: {}", res);
    res
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_generator() -> Result<()> {
        let name = name_generator(10, None);
        assert_eq!(name.len(), 21);
        let (left, right) = name.split_once('_').unwrap();
        assert_eq!(left.len(), 10);
        assert_eq!(right.len(), 10);
        assert!(name
            .chars()
            .all(|c| c == '_' || NAME_CHARSET.contains(c)));
        Ok(())
    }

    #[test]
    fn test_name_generator_charset() -> Result<()> {
        let name = name_generator(4, Some("ab"));
        assert_eq!(name.len(), 9);
        assert!(name.chars().all(|c| matches!(c, 'a' | 'b' | '_')));

        // Empty charset falls back to the default one.
        let name = name_generator(3, Some(""));
        assert_eq!(name.len(), 7);
        Ok(())
    }
}
