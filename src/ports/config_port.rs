//! Configuration access port trait.

/// Sectioned key/value settings. Typed getters return `default` when the
/// key is absent or does not parse.
pub trait ConfigPort {
    /// Raw value, untrimmed, as written in the source.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
