pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Joins REST path segments, leaving SDMX wildcards (`*`, `+`, `~`) untouched.
pub(crate) fn resource_path(segments: &[&str]) -> String {
    let mut out = String::new();
    for s in segments {
        out.push('/');
        out.push_str(s.trim_matches('/'));
    }
    out
}

/// SDMX `IDType`: ASCII letters, digits, `_`, `@`, `$` and `-`.
///
/// Dataset ids and key codes go into the REST path verbatim, so anything else
/// (`/`, `?`, `#`, ...) is rejected before a request is built.
pub(crate) fn is_sdmx_id(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'$' | b'-'))
}

/// Extracts the maintainable id from an SDMX URN or a bare `AGENCY:ID(VERSION)` reference.
///
/// `urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_COUNTRY(1.0)` gives `CL_COUNTRY`.
pub(crate) fn id_from_urn(urn: &str) -> Option<&str> {
    let tail = urn.rsplit_once('=').map(|(_, t)| t).unwrap_or(urn);
    let tail = tail.split_once(':').map(|(_, t)| t).unwrap_or(tail);
    let id = tail.split('(').next().unwrap_or(tail).trim();
    if id.is_empty() { None } else { Some(id) }
}
