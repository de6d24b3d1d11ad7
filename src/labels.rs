//! Label environments: lookups from human-readable names to codes.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Turns a display name into an identifier-safe label.
///
/// ASCII letters and digits are kept, every other character becomes `_`,
/// whitespace and underscore runs collapse to one `_`, edges are trimmed, and
/// an `X` is prepended when the label would not start with a letter. Case is
/// preserved, and sanitizing a sanitized label returns it unchanged.
///
/// ```
/// use imfdata::sanitize;
///
/// assert_eq!(sanitize("United States"), "United_States");
/// assert_eq!(sanitize("Korea, Rep. of"), "Korea_Rep_of");
/// assert_eq!(sanitize("2020 vintage"), "X2020_vintage");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let ch = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if ch == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(ch);
    }
    while out.ends_with('_') {
        out.pop();
    }
    if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert(0, 'X');
    }
    out
}

/// Immutable mapping from sanitized code names to code ids, in codelist order.
///
/// Two codes whose names sanitize to the same label never share it: the first
/// keeps the bare label, later ones get `_2`, `_3`, ... (the first free suffix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelEnv {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl LabelEnv {
    /// Builds an environment from `(name, code_id)` pairs. Pairs with a blank id are skipped.
    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<String>,
    {
        let mut env = Self::default();
        for (name, code) in pairs {
            let code = code.into();
            if code.trim().is_empty() {
                continue;
            }
            let base = sanitize(name.as_ref());
            let mut label = base.clone();
            let mut n = 2;
            while env.index.contains_key(&label) {
                label = format!("{base}_{n}");
                n += 1;
            }
            env.index.insert(label.clone(), env.entries.len());
            env.entries.push((label, code));
        }
        env
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.index.get(label).map(|&i| self.entries[i].1.as_str())
    }

    /// Like [`get`](Self::get) but fails with [`Error::UnknownLabel`].
    pub fn code(&self, label: &str) -> Result<&str> {
        self.get(label)
            .ok_or_else(|| Error::UnknownLabel(label.to_string()))
    }

    /// Resolves several labels at once, e.g. to fill one key group.
    pub fn codes<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<String>> {
        labels
            .iter()
            .map(|l| self.code(l.as_ref()).map(str::to_string))
            .collect()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered mapping from dimension id to its codelist id (`None` for `TIME_PERIOD`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionEnv {
    entries: Vec<(String, Option<String>)>,
}

impl DimensionEnv {
    pub(crate) fn new(entries: Vec<(String, Option<String>)>) -> Self {
        Self { entries }
    }

    /// `None` when the dimension is unknown, `Some(None)` when it has no codelist.
    pub fn get(&self, dimension: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(d, _)| d == dimension)
            .map(|(_, cl)| cl.as_deref())
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(d, cl)| (d.as_str(), cl.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("United States", "United_States")]
    #[case("  Euro area  ", "Euro_area")]
    #[case("China, P.R.: Hong Kong", "China_P_R_Hong_Kong")]
    #[case("Gross domestic product (GDP), current prices", "Gross_domestic_product_GDP_current_prices")]
    #[case("Côte d'Ivoire", "C_te_d_Ivoire")]
    #[case("Percent/ratio", "Percent_ratio")]
    #[case("__private__", "private")]
    #[case("10-year yield", "X10_year_yield")]
    #[case("", "X")]
    #[case("()", "X")]
    fn sanitizes_names(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize(name), expected);
    }

    #[test]
    fn disambiguates_collisions_in_codelist_order() {
        let env = LabelEnv::from_pairs([
            ("Korea (Rep.)", "KOR"),
            ("Korea, Rep.", "KOR2"),
            ("Korea Rep", "KOR3"),
            ("Korea Rep 2", "KR2"),
        ]);
        assert_eq!(env.get("Korea_Rep"), Some("KOR"));
        assert_eq!(env.get("Korea_Rep_2"), Some("KOR2"));
        assert_eq!(env.get("Korea_Rep_3"), Some("KOR3"));
        // Its natural label is taken, so it moves to the next free suffix.
        assert_eq!(env.get("Korea_Rep_2_2"), Some("KR2"));
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn skips_blank_codes_and_reports_unknown_labels() {
        let env = LabelEnv::from_pairs([("Annual", "A"), ("Nothing", " ")]);
        assert_eq!(env.labels().collect::<Vec<_>>(), vec!["Annual"]);
        assert_eq!(env.codes(&["Annual"]).unwrap(), vec!["A".to_string()]);
        assert!(matches!(env.code("Nothing"), Err(Error::UnknownLabel(l)) if l == "Nothing"));
    }

    #[test]
    fn dimension_env_keeps_time_period_without_codelist() {
        let env = DimensionEnv::new(vec![
            ("COUNTRY".into(), Some("CL_COUNTRY".into())),
            ("TIME_PERIOD".into(), None),
        ]);
        assert_eq!(env.get("COUNTRY"), Some(Some("CL_COUNTRY")));
        assert_eq!(env.get("TIME_PERIOD"), Some(None));
        assert_eq!(env.get("FREQ"), None);
        assert_eq!(env.dimensions().collect::<Vec<_>>(), vec!["COUNTRY", "TIME_PERIOD"]);
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in ".{0,40}") {
            let once = sanitize(&name);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }

        #[test]
        fn labels_never_collide(names in prop::collection::vec("[ a-zA-Z(),.]{0,12}", 0..30)) {
            let env = LabelEnv::from_pairs(
                names.iter().enumerate().map(|(i, n)| (n.as_str(), format!("C{i}"))),
            );
            prop_assert_eq!(env.len(), names.len());
            let mut labels: Vec<&str> = env.labels().collect();
            labels.sort_unstable();
            labels.dedup();
            prop_assert_eq!(labels.len(), names.len());
        }
    }
}
