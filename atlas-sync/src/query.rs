use atlas_catalog::{LocationContext, non_blank};

/// Build the text-search query for an entity.
///
/// Name first, then the street address if there is one, otherwise the
/// sub-region and region. The country comes last; when the location has
/// none, `country_qualifier` is appended unless an earlier part already
/// mentions it. Blank fields are skipped, so this never fails.
pub fn build_query(name: &str, location: &LocationContext, country_qualifier: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(4);

    if let Some(name) = non_blank(Some(name)) {
        parts.push(name);
    }

    if let Some(address) = non_blank(location.address.as_deref()) {
        parts.push(address);
    } else {
        parts.extend(non_blank(location.sub_region.as_deref()));
        parts.extend(non_blank(location.region.as_deref()));
    }

    if let Some(country) = non_blank(location.country.as_deref()) {
        parts.push(country);
    } else if let Some(qualifier) = non_blank(Some(country_qualifier)) {
        let needle = qualifier.to_lowercase();
        if !parts.iter().any(|p| p.to_lowercase().contains(&needle)) {
            parts.push(qualifier);
        }
    }

    parts.join(", ")
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
