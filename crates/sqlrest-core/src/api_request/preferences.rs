//! `Prefer`, `Accept`, and `Range` header parsing (§4.5, §6).

/// `Prefer: count=<exact|planned|estimated>` (§4.5). `planned`/`estimated`
/// are accepted as distinct tokens but compiled identically to `exact` —
/// the spec gives the core no query-planner estimate to draw on, so the
/// distinction is preserved only for the client-visible Prefer echo, not
/// the execution path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountPreference {
    Exact,
    Planned,
    Estimated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnPreference {
    Representation,
    Minimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionPreference {
    MergeDuplicates,
    IgnoreDuplicates,
}

/// The decoded `Prefer` header, a comma-separated list of tokens. Unknown
/// tokens are silently dropped (§4.5: "reject unknown Prefer tokens
/// silently").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    pub count: Option<CountPreference>,
    pub return_pref: Option<ReturnPreference>,
    pub resolution: Option<ResolutionPreference>,
    pub on_conflict: Option<Vec<String>>,
    pub explain: bool,
}

/// The known top-level `Prefer` keywords, used to tell a bare continuation
/// column (`on-conflict=c1,c2`'s `c2` piece) apart from the next real token
/// when comma-splitting the whole header — `on-conflict`'s value is itself
/// allowed to contain commas (§4.5/§6).
fn is_known_token_start(piece: &str) -> bool {
    let key = piece.split_once('=').map(|(k, _)| k).unwrap_or(piece);
    matches!(key, "count" | "return" | "resolution" | "on-conflict" | "explain")
}

pub fn parse_prefer_header(value: &str) -> Preferences {
    let mut prefs = Preferences::default();

    let pieces: Vec<&str> = value.split(',').map(str::trim).collect();
    let mut i = 0;
    while i < pieces.len() {
        let token = pieces[i];
        match token.split_once('=') {
            Some(("count", "exact")) => prefs.count = Some(CountPreference::Exact),
            Some(("count", "planned")) => prefs.count = Some(CountPreference::Planned),
            Some(("count", "estimated")) => prefs.count = Some(CountPreference::Estimated),
            Some(("return", "representation")) => {
                prefs.return_pref = Some(ReturnPreference::Representation)
            }
            Some(("return", "minimal")) => prefs.return_pref = Some(ReturnPreference::Minimal),
            Some(("resolution", "merge-duplicates")) => {
                prefs.resolution = Some(ResolutionPreference::MergeDuplicates)
            }
            Some(("resolution", "ignore-duplicates")) => {
                prefs.resolution = Some(ResolutionPreference::IgnoreDuplicates)
            }
            Some(("on-conflict", first_col)) => {
                let mut cols = vec![first_col.trim().to_string()];
                while i + 1 < pieces.len() && !pieces[i + 1].is_empty() && !is_known_token_start(pieces[i + 1]) {
                    i += 1;
                    cols.push(pieces[i].to_string());
                }
                prefs.on_conflict = Some(cols.into_iter().filter(|c| !c.is_empty()).collect());
            }
            Some(("explain", "true")) => prefs.explain = true,
            Some(("explain", "false")) => prefs.explain = false,
            None if token == "explain" => prefs.explain = true,
            _ => {}
        }
        i += 1;
    }

    prefs
}

/// `Accept` header negotiation (§6): JSON by default, the PostgREST
/// single-object media type, or CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accept {
    Json,
    SingleObject,
    Csv,
}

pub fn parse_accept_header(value: &str) -> Accept {
    for media in value.split(',').map(str::trim) {
        let media = media.split(';').next().unwrap_or(media).trim();
        match media {
            "application/vnd.pgrst.object+json" => return Accept::SingleObject,
            "text/csv" => return Accept::Csv,
            "application/json" | "*/*" => return Accept::Json,
            _ => continue,
        }
    }
    Accept::Json
}

/// A parsed `Range` header: `[items=]start-end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeHeader {
    pub offset: i64,
    pub limit: i64,
}

/// Parses `[items=]S-E` into `offset=S, limit=E-S+1`. Invalid input
/// returns `None`, meaning the header is ignored, not an error (§4.5).
pub fn parse_range_header(value: &str) -> Option<RangeHeader> {
    let value = value.strip_prefix("items=").unwrap_or(value);
    let (start, end) = value.split_once('-')?;
    let start: i64 = start.trim().parse().ok()?;
    let end: i64 = end.trim().parse().ok()?;
    if end < start {
        return None;
    }
    Some(RangeHeader {
        offset: start,
        limit: end - start + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefer_header_known_tokens() {
        let prefs = parse_prefer_header("count=exact,return=representation,explain");
        assert_eq!(prefs.count, Some(CountPreference::Exact));
        assert_eq!(prefs.return_pref, Some(ReturnPreference::Representation));
        assert!(prefs.explain);
    }

    #[test]
    fn prefer_header_unknown_tokens_dropped() {
        let prefs = parse_prefer_header("count=exact,bogus=1,tx=rollback");
        assert_eq!(prefs.count, Some(CountPreference::Exact));
        assert_eq!(prefs.resolution, None);
    }

    #[test]
    fn prefer_header_parses_on_conflict_target() {
        let prefs = parse_prefer_header("resolution=merge-duplicates,on-conflict=email,tenant_id");
        assert_eq!(prefs.resolution, Some(ResolutionPreference::MergeDuplicates));
        assert_eq!(prefs.on_conflict, Some(vec!["email".to_string(), "tenant_id".to_string()]));
    }

    #[test]
    fn accept_header_variants() {
        assert_eq!(parse_accept_header("application/json"), Accept::Json);
        assert_eq!(
            parse_accept_header("application/vnd.pgrst.object+json"),
            Accept::SingleObject
        );
        assert_eq!(parse_accept_header("text/csv"), Accept::Csv);
        assert_eq!(parse_accept_header(""), Accept::Json);
    }

    #[test]
    fn range_header_parses_items_prefix() {
        let r = parse_range_header("items=0-9").unwrap();
        assert_eq!(r.offset, 0);
        assert_eq!(r.limit, 10);
    }

    #[test]
    fn range_header_invalid_is_ignored() {
        assert!(parse_range_header("banana").is_none());
        assert!(parse_range_header("9-0").is_none());
    }
}
