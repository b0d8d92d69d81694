//! Tracer configuration.

use fxhash::FxHashSet;
use lazy_static::lazy_static;
use std::str::FromStr;

lazy_static! {
    /// Character- and block-input routines from libc, matched by
    /// exact name.
    static ref DEFAULT_INPUT_ROUTINES: FxHashSet<&'static str> = [
        "getc", "_IO_getc", "fgetc", "getchar", "gets", "fgets", "getline", "getdelim", "read",
        "fread",
    ]
    .iter()
    .copied()
    .collect();
}

/// Every name containing one of these is an input routine
/// (`scanf`, `fscanf`, `__isoc99_sscanf`, ...).
const DEFAULT_INPUT_SUBSTRINGS: &[&str] = &["scanf"];

/// How long the visit ledger lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerScope {
    /// A fresh ledger for every seed. A node reached from two
    /// unrelated seeds is traced for both.
    PerSeed,
    /// One ledger for the lifetime of the tracer. A node already
    /// traced for an earlier seed is not expanded again.
    PerModule,
}

impl Default for LedgerScope {
    fn default() -> Self {
        LedgerScope::PerSeed
    }
}

impl FromStr for LedgerScope {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "per-seed" => Ok(LedgerScope::PerSeed),
            "per-module" => Ok(LedgerScope::PerModule),
            _ => anyhow::bail!("unknown ledger scope `{}` (expected per-seed or per-module)", s),
        }
    }
}

/// What to do with a store found by the forward scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorePolicy {
    /// Record the store; do not trace what was stored.
    Terminal,
    /// Also trace the stored value backward.
    FollowSource,
}

impl Default for StorePolicy {
    fn default() -> Self {
        StorePolicy::Terminal
    }
}

impl FromStr for StorePolicy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "terminal" => Ok(StorePolicy::Terminal),
            "follow-source" => Ok(StorePolicy::FollowSource),
            _ => anyhow::bail!(
                "unknown store policy `{}` (expected terminal or follow-source)",
                s
            ),
        }
    }
}

/// The set of callee names treated as sources of external input.
#[derive(Clone, Debug)]
pub struct InputRoutines {
    exact: FxHashSet<String>,
    substrings: Vec<String>,
}

impl Default for InputRoutines {
    fn default() -> Self {
        InputRoutines {
            exact: DEFAULT_INPUT_ROUTINES
                .iter()
                .map(|&name| name.to_owned())
                .collect(),
            substrings: DEFAULT_INPUT_SUBSTRINGS
                .iter()
                .map(|&s| s.to_owned())
                .collect(),
        }
    }
}

impl InputRoutines {
    /// No input routines at all.
    pub fn none() -> Self {
        InputRoutines {
            exact: FxHashSet::default(),
            substrings: vec![],
        }
    }

    pub fn add_exact(&mut self, name: &str) {
        self.exact.insert(name.to_owned());
    }

    pub fn add_substring(&mut self, pattern: &str) {
        self.substrings.push(pattern.to_owned());
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.substrings.iter().any(|s| name.contains(&s[..]))
    }
}

#[derive(Clone, Debug)]
pub struct TraceConfig {
    pub scope: LedgerScope,
    pub store_policy: StorePolicy,
    /// Scan the users of parameters, locals and globals.
    pub forward_scan: bool,
    pub input_routines: InputRoutines,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            scope: LedgerScope::default(),
            store_policy: StorePolicy::default(),
            forward_scan: true,
            input_routines: InputRoutines::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_input_routines() {
        let routines = InputRoutines::default();
        assert!(routines.matches("scanf"));
        assert!(routines.matches("__isoc99_fscanf"));
        assert!(routines.matches("getc"));
        assert!(routines.matches("fgets"));
        assert!(!routines.matches("getcwd"));
        assert!(!routines.matches("printf"));
    }

    #[test]
    fn custom_input_routines() {
        let mut routines = InputRoutines::none();
        assert!(!routines.matches("scanf"));
        routines.add_exact("recv");
        routines.add_substring("read_");
        assert!(routines.matches("recv"));
        assert!(!routines.matches("recvfrom"));
        assert!(routines.matches("my_read_line"));
    }

    #[test]
    fn parse_options() {
        assert_eq!(
            "per-module".parse::<LedgerScope>().unwrap(),
            LedgerScope::PerModule
        );
        assert_eq!(
            "follow-source".parse::<StorePolicy>().unwrap(),
            StorePolicy::FollowSource
        );
        assert!("sometimes".parse::<StorePolicy>().is_err());
    }
}
