//! Process-wide debug overrides, resolved once into a plain snapshot.
//!
//! Encoders never consult the environment themselves: the caller reads a [`DebugOverrides`]
//! (usually via [`DebugOverrides::from_env`]) and passes it into each encode call.

use gfxcmd_hw::CachePolicy;
use tracing::warn;

pub const FORCE_STATELESS_L1_CACHE_POLICY_ENV: &str = "GFXCMD_FORCE_STATELESS_L1_CACHE_POLICY";
pub const FORCE_ALL_RESOURCES_UNCACHED_ENV: &str = "GFXCMD_FORCE_ALL_RESOURCES_UNCACHED";
pub const ENABLE_SW_TAGS_ENV: &str = "GFXCMD_ENABLE_SW_TAGS";
pub const SW_TAGS_MAX_COUNT_ENV: &str = "GFXCMD_SW_TAGS_MAX_COUNT";
pub const SW_TAGS_HEAP_SIZE_ENV: &str = "GFXCMD_SW_TAGS_HEAP_SIZE";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugOverrides {
    /// Stateless L1 cache policy used when the caller does not pick one.
    pub force_stateless_l1_cache_policy: Option<CachePolicy>,
    pub force_all_resources_uncached: bool,
    pub enable_sw_tags: bool,
    pub sw_tags_max_count: Option<u32>,
    pub sw_tags_heap_size: Option<usize>,
}

impl DebugOverrides {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve overrides through `lookup` instead of the process environment.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let truthy = |name: &str| lookup(name).is_some_and(|raw| is_truthy(&raw));

        Self {
            force_stateless_l1_cache_policy: parse_var(&lookup, FORCE_STATELESS_L1_CACHE_POLICY_ENV)
                .and_then(|v: u32| {
                    let policy = CachePolicy::from_u32(v);
                    if policy.is_none() {
                        warn!(
                            var = FORCE_STATELESS_L1_CACHE_POLICY_ENV,
                            value = v,
                            "ignoring unknown L1 cache policy"
                        );
                    }
                    policy
                }),
            force_all_resources_uncached: truthy(FORCE_ALL_RESOURCES_UNCACHED_ENV),
            enable_sw_tags: truthy(ENABLE_SW_TAGS_ENV),
            sw_tags_max_count: parse_var(&lookup, SW_TAGS_MAX_COUNT_ENV),
            sw_tags_heap_size: parse_var(&lookup, SW_TAGS_HEAP_SIZE_ENV),
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

fn parse_var<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!(var = name, value = %raw, "ignoring unparseable debug override");
    }
    parsed
}
