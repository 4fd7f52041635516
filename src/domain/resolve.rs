/// Returns the most specific configured value.
///
/// Layers are consulted in order: explicit override, per-type entry, type
/// defaults, global feature default. The fallback is used when none is set.
#[must_use]
pub fn resolve<T>(explicit: Option<T>, kind: Option<T>, defaults: Option<T>, global: Option<T>, fallback: T) -> T {
    explicit.or(kind).or(defaults).or(global).unwrap_or(fallback)
}
