//! "Did you mean" suggestions for misspelled attribute names.

/// Closest candidate to `name` by edit distance, if any is close enough to be
/// a plausible typo. Ties go to the candidate that sorts first.
pub fn did_you_mean<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max_distance = (name.chars().count() + 1) / 2;

    candidates
        .into_iter()
        .filter(|c| *c != name)
        .map(|c| (strsim::levenshtein(name, c), c))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.cmp(b)))
        .map(|(_, c)| c.to_string())
}

/// Suffix appended to error messages: `, did you mean 'x'?` or nothing.
pub fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean '{}'?", s),
        None => String::new(),
    }
}
