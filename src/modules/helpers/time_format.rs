/// Display helpers for run times.
///
/// Minutes are rendered as a single character so the display keeps a fixed
/// width: a decimal digit below 10, one hexadecimal digit from 10 to 15 and
/// `X` above that.
pub struct TimeFormat {}

impl TimeFormat {
    /// # seconds as time string
    /// format an amount of seconds as `m:ss`
    ///
    /// ## Arguments
    /// * `time_in_seconds` - The time to format, fractions are dropped
    ///
    /// ## Returns
    /// * `String` - The formatted time
    pub fn seconds_as_time_string(time_in_seconds: f64) -> String {
        let total = time_in_seconds.max(0.0).floor() as u64;
        let minutes = total / 60;
        let seconds = total % 60;

        let minutes = match minutes {
            0..=15 => std::char::from_digit(minutes as u32, 16).unwrap_or('X'),
            _ => 'X',
        };

        format!("{}:{:02}", minutes, seconds)
    }

    /// # remaining time string
    /// format the time left until `max_time`. an overrun gets a leading `-`
    ///
    /// ## Arguments
    /// * `max_time` - The maximum run time in seconds
    /// * `elapsed` - The elapsed run time in seconds
    pub fn remaining_time_string(max_time: f64, elapsed: f64) -> String {
        let remaining = max_time - elapsed.floor();
        let sign = if remaining < 0.0 { "-" } else { "" };
        format!("{}{}", sign, TimeFormat::seconds_as_time_string(remaining.abs()))
    }
}
