pub struct Math {}

impl Math {
    /// # round to n decimals
    /// round a float to a fixed number of decimal digits.
    /// multipliers are reported with 10 digits so rounding noise like
    /// `1.4 * 1.4 = 1.9599999999999997` is reported as `1.96`
    ///
    /// ## Arguments
    /// * `number` - The number to round
    /// * `decimals` - The amount of decimal digits to keep
    ///
    /// ## Returns
    /// * `f64` - The rounded number
    pub fn round_float_to_n_decimals(number: f64, decimals: i32) -> f64 {
        let multiplier = 10.0_f64.powi(decimals);
        (number * multiplier).round() / multiplier
    }

    /// # product
    /// multiply all the numbers, the empty product is 1
    pub fn product(nums: &[f64]) -> f64 {
        nums.iter().product()
    }

    /// # first digit
    /// get the first decimal digit that appears in the string
    ///
    /// ## Arguments
    /// * `text` - The text to look in
    ///
    /// ## Returns
    /// * `Option<u32>` - The digit, none if the text has no digits
    pub fn first_digit(text: &str) -> Option<u32> {
        text.chars().find_map(|c| c.to_digit(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_away_float_noise() {
        assert_eq!(Math::round_float_to_n_decimals(1.4_f64.powi(2), 10), 1.96);
        assert_eq!(Math::round_float_to_n_decimals(1.96 * 1.2, 10), 2.352);
        assert_eq!(Math::round_float_to_n_decimals(2.345, 1), 2.3);
    }

    #[test]
    fn empty_product_is_one() {
        assert_eq!(Math::product(&[]), 1.0);
        assert_eq!(Math::product(&[2.0, 1.5]), 3.0);
    }

    #[test]
    fn first_digit_of_round_name() {
        assert_eq!(Math::first_digit("Round 3"), Some(3));
        assert_eq!(Math::first_digit("Live Round 12"), Some(1));
        assert_eq!(Math::first_digit("Final"), None);
        assert_eq!(Math::first_digit("R-4b"), Some(4));
    }
}
