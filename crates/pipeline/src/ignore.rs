use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Component, Path};
use std::sync::Arc;

/// Which files the processor hands back untouched without looking at them.
#[derive(Clone)]
pub enum Ignore {
    Nothing,
    /// Any path with one of these directory names as a component, e.g.
    /// `node_modules` matches `a/node_modules/b.png` but not
    /// `my_node_modules/b.png`.
    Components(Vec<String>),
    Custom(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl Ignore {
    pub fn components(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Components(names.into_iter().map(Into::into).collect())
    }

    pub fn custom(predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Nothing => false,
            Self::Components(names) => path.components().any(|component| match component {
                Component::Normal(part) => names.iter().any(|name| part == name.as_str()),
                _ => false,
            }),
            Self::Custom(predicate) => predicate(path),
        }
    }
}

impl Default for Ignore {
    fn default() -> Self {
        Self::components(["node_modules"])
    }
}

impl Debug for Ignore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::Components(names) => f.debug_tuple("Components").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("node_modules/pkg/logo.png", true)]
    #[case("web/node_modules/pkg/logo.png", true)]
    #[case("web/my_node_modules/logo.png", false)]
    #[case("web/node_modules.png", false)]
    #[case("doc/img/logo.png", false)]
    fn test_default(#[case] path: &str, #[case] ignored: bool) {
        assert_eq!(Ignore::default().matches(Path::new(path)), ignored);
    }

    #[test]
    fn test_nothing_and_custom() {
        let path = Path::new("node_modules/logo.png");
        assert!(!Ignore::Nothing.matches(path));
        let custom = Ignore::custom(|p| p.starts_with("vendor"));
        assert!(custom.matches(Path::new("vendor/logo.png")));
        assert!(!custom.matches(path));
        assert_eq!(format!("{custom:?}"), "Custom(..)");
    }
}
