//! Serialization of per-dimension code selections into SDMX query keys.
//!
//! A key is `codeA,codeB.code.code`: groups in dimension order separated by `.`,
//! codes inside a group separated by `,`, an empty group meaning "all codes".

pub const GROUP_SEPARATOR: char = '.';
pub const CODE_SEPARATOR: char = ',';

/// Joins code groups into a query key.
///
/// Blank items are dropped, so a group made only of blanks becomes a wildcard.
/// The builder knows nothing about the dataset; callers supply groups in
/// dimension order.
///
/// ```
/// use imfdata::make_key_str;
///
/// assert_eq!(make_key_str(&[vec!["USA", "NLD"], vec!["LUR"], vec!["A"]]), "USA,NLD.LUR.A");
/// assert_eq!(make_key_str(&[vec![], vec!["LUR"], vec!["A"]]), ".LUR.A");
/// ```
pub fn make_key_str<G, S>(groups: &[G]) -> String
where
    G: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push(GROUP_SEPARATOR);
        }
        let mut first = true;
        for code in group.as_ref() {
            let code = code.as_ref().trim();
            if code.is_empty() {
                continue;
            }
            if !first {
                out.push(CODE_SEPARATOR);
            }
            first = false;
            out.push_str(code);
        }
    }
    out
}

/// Splits a key back into its groups; a wildcard group comes back empty.
pub fn parse_key(key: &str) -> Vec<Vec<String>> {
    key.split(GROUP_SEPARATOR)
        .map(|group| {
            group
                .split(CODE_SEPARATOR)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::multi_code(vec![vec!["USA", "NLD"], vec!["LUR"], vec!["A"]], "USA,NLD.LUR.A")]
    #[case::leading_wildcard(vec![vec![], vec!["LUR"], vec!["A"]], ".LUR.A")]
    #[case::trailing_wildcard(vec![vec!["USA"], vec!["LUR"], vec![]], "USA.LUR.")]
    #[case::all_wildcards(vec![vec![], vec![], vec![]], "..")]
    #[case::blank_items_dropped(vec![vec!["USA", " ", ""], vec!["", "LUR"]], "USA.LUR")]
    #[case::single_group(vec![vec!["G001"]], "G001")]
    #[case::no_groups(vec![], "")]
    fn builds_keys(#[case] groups: Vec<Vec<&str>>, #[case] expected: &str) {
        assert_eq!(make_key_str(&groups), expected);
    }

    #[test]
    fn accepts_arrays_and_owned_strings() {
        let countries = vec!["USA".to_string(), "JPN".to_string()];
        let indicators = vec!["NGDP_RPCH".to_string()];
        let groups = [countries.as_slice(), indicators.as_slice()];
        assert_eq!(make_key_str(&groups), "USA,JPN.NGDP_RPCH");
    }

    #[test]
    fn parses_wildcards_as_empty_groups() {
        assert_eq!(
            parse_key("USA,NLD..A"),
            vec![
                vec!["USA".to_string(), "NLD".to_string()],
                vec![],
                vec!["A".to_string()],
            ]
        );
    }

    proptest! {
        #[test]
        fn parse_inverts_make(groups in prop::collection::vec(
            prop::collection::vec("[A-Z0-9_]{1,8}", 0..4),
            1..6,
        )) {
            let key = make_key_str(&groups);
            prop_assert_eq!(parse_key(&key), groups.clone());
            prop_assert_eq!(key.matches(GROUP_SEPARATOR).count(), groups.len() - 1);
        }
    }
}
