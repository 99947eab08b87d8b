//! URL slugs for products and categories.

/// Build a URL-safe slug from a product or category name.
///
/// Lowercases, folds Spanish diacritics to ASCII, and collapses every run of
/// non-alphanumeric characters into a single `-`.
///
/// ```
/// use pasteleria_core::slugify;
///
/// assert_eq!(slugify("Torta Cuadrada de Chocolate"), "torta-cuadrada-de-chocolate");
/// assert_eq!(slugify("Pastelería  Vegana / Ñandú!"), "pasteleria-vegana-nandu");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Fold text for case- and accent-insensitive matching.
///
/// Lowercases and folds the same diacritics as [`slugify`], keeping every
/// other character.
///
/// ```
/// use pasteleria_core::search_key;
///
/// assert_eq!(search_key("TIRAMISÚ Clásico"), "tiramisu clasico");
/// ```
#[must_use]
pub fn search_key(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect()
}

const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Torta Circular de Vainilla"), "torta-circular-de-vainilla");
    }

    #[test]
    fn test_slugify_accents_and_enye() {
        assert_eq!(slugify("Mousse de Limón"), "mousse-de-limon");
        assert_eq!(slugify("TORTA ESPECIAL DE CUMPLEAÑOS"), "torta-especial-de-cumpleanos");
    }

    #[test]
    fn test_slugify_collapses_separators_and_trims() {
        assert_eq!(slugify("  --Tarta   de  Santiago!!  "), "tarta-de-santiago");
        assert_eq!(slugify("Brownie_Sin/Gluten"), "brownie-sin-gluten");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("Pack 12 Empanadas"), "pack-12-empanadas");
    }

    #[test]
    fn test_search_key_folds_case_and_accents() {
        assert_eq!(search_key("Tiramisú Clásico"), search_key("TIRAMISÚ CLÁSICO"));
        assert_eq!(search_key("Ñandú"), "nandu");
        assert_eq!(search_key("50% off_"), "50% off_");
    }

    #[test]
    fn test_slugify_empty_and_symbols_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("¡¿?!"), "");
    }
}
