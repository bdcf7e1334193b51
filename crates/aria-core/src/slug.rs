//! URL slugs.

/// Turns a display name into a URL slug.
///
/// Norwegian letters are transliterated, everything else that is not ASCII
/// alphanumeric collapses into single hyphens.
///
/// ## Example
/// ```rust
/// use aria_core::slug::slugify;
///
/// assert_eq!(slugify("Hvit Blank Flis 30×60"), "hvit-blank-flis-30-60");
/// assert_eq!(slugify("Bad & Kjøkken"), "bad-kjokken");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let mapped: &str = match c {
            'æ' => "ae",
            'ø' | 'ö' => "o",
            'å' | 'ä' => "a",
            'é' | 'è' => "e",
            c if c.is_ascii_alphanumeric() => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c);
                continue;
            }
            _ => {
                pending_hyphen = true;
                continue;
            }
        };

        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.push_str(mapped);
    }

    slug
}
