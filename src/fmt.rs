/// Format a float as a French-Canadian dollar amount: `1 234,56 $`.
///
/// The thousands separator is a plain space and the decimal separator a comma,
/// whatever locale the source cells were typed in.
pub fn money(val: f64) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    format!("{}{} $", if negative { "-" } else { "" }, grouped(val.abs()))
}

fn grouped(abs: f64) -> String {
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_spaces = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_spaces.push(' ');
        }
        with_spaces.push(c);
    }
    let with_spaces: String = with_spaces.chars().rev().collect();
    format!("{with_spaces},{dec_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "1 234,56 $");
        assert_eq!(money(-500.00), "-500,00 $");
        assert_eq!(money(0.0), "0,00 $");
        assert_eq!(money(1000000.99), "1 000 000,99 $");
        assert_eq!(money(42.10), "42,10 $");
    }

    #[test]
    fn test_money_never_shows_negative_zero() {
        assert_eq!(money(-0.001), "0,00 $");
        assert_eq!(money(-0.0), "0,00 $");
    }
}
