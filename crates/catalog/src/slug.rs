//! URL slugs for categories and products.

/// Build a URL slug from a display name.
///
/// Lower-cases, transliterates Cyrillic to Latin, and joins runs of
/// alphanumerics with single dashes. May return an empty string when the
/// input has no usable characters; callers decide whether that is an error.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let piece: Option<&str> = if ch.is_ascii_alphanumeric() {
            None
        } else {
            match transliterate(ch) {
                Some(latin) => Some(latin),
                None => {
                    pending_dash = !out.is_empty();
                    continue;
                }
            }
        };

        if pending_dash {
            out.push('-');
            pending_dash = false;
        }
        match piece {
            Some(latin) => out.push_str(latin),
            None => out.push(ch),
        }
    }

    out
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names() {
        assert_eq!(slugify("Running Shoes"), "running-shoes");
        assert_eq!(slugify("  T-Shirt  (XL) "), "t-shirt-xl");
        assert_eq!(slugify("100% Cotton!!"), "100-cotton");
    }

    #[test]
    fn cyrillic_names() {
        assert_eq!(slugify("Кроссовки"), "krossovki");
        assert_eq!(slugify("Чай зелёный"), "chay-zelenyy");
        assert_eq!(slugify("Объём"), "obem");
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(slugify("!!! ???"), "");
    }
}
