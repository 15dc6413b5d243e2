use std::collections::BTreeMap;
use std::time::Duration;

use clap::Parser;

use crate::error::Error;
use crate::types::OpsState;

/// Batch update GameServers of one or more GameServerSets
#[derive(Parser, Debug, Clone)]
#[command(name = "gs-updater", version)]
pub struct Args {
    /// Comma separated GameServerSet names. Empty selects every GameServerSet in the namespace
    #[arg(long = "gss-name", default_value = "")]
    pub gss_name: String,

    /// Namespace of the GameServerSets
    #[arg(long)]
    pub namespace: String,

    /// Overall timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Seconds to wait between two attempts
    #[arg(long, default_value_t = 5)]
    pub interval: u64,

    /// Comma separated GameServer ordinals to select
    #[arg(long = "select-ids", default_value = "")]
    pub select_ids: String,

    /// Only select GameServers in this opsState
    #[arg(long = "select-opsState", default_value = "")]
    pub select_ops_state: String,

    /// Only select GameServers whose networkDisabled equals this ("true" or "false")
    #[arg(long = "select-networkDisabled", default_value = "")]
    pub select_network_disabled: String,

    /// Comma separated container/image pairs. GameServers running any of them are skipped
    #[arg(long = "select-not-container-image", default_value = "")]
    pub select_not_container_image: String,

    /// opsState to set on the selected GameServers
    #[arg(long = "exp-opsState", default_value = "")]
    pub exp_ops_state: String,

    /// networkDisabled to set on the selected GameServers ("true" or "false")
    #[arg(long = "exp-networkDisabled", default_value = "")]
    pub exp_network_disabled: String,
}

impl Args {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn interval(&self) -> Result<Duration, Error> {
        if self.interval == 0 {
            return Err(Error::InvalidArgument("interval must be positive".to_string()));
        }
        Ok(Duration::from_secs(self.interval))
    }
}

/// Which GameServerSets to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    /// Every GameServerSet found in the namespace at the time of the pass.
    All,
    Named(Vec<String>),
}

/// Criteria a GameServer must all meet to be updated. Unset criteria match everything.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub namespace: String,
    pub groups: GroupSelector,
    /// Ordinals turned into `<gss>-<ordinal>` names once the groups are known.
    pub ids: Vec<u64>,
    pub ops_state: Option<OpsState>,
    pub network_disabled: Option<bool>,
    /// container name -> image that excludes a GameServer when running in that container
    pub not_container_image: BTreeMap<String, String>,
}

/// Fields to write on every selected GameServer. Unset fields are left alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpectOption {
    pub ops_state: Option<OpsState>,
    pub network_disabled: Option<bool>,
}

impl TryFrom<&Args> for SelectOption {
    type Error = Error;

    fn try_from(args: &Args) -> Result<Self, Error> {
        let groups = match split_list("gss-name", &args.gss_name)?.as_slice() {
            [] => GroupSelector::All,
            names => GroupSelector::Named(names.iter().map(|name| name.to_string()).collect()),
        };

        let ids = split_list("select-ids", &args.select_ids)?
            .into_iter()
            .map(|id| {
                id.parse::<u64>()
                    .map_err(|_| Error::InvalidArgument(format!("invalid id {:?}", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SelectOption {
            namespace: args.namespace.clone(),
            groups,
            ids,
            ops_state: parse_ops_state(&args.select_ops_state),
            network_disabled: parse_bool(&args.select_network_disabled),
            not_container_image: parse_container_images(&args.select_not_container_image)?,
        })
    }
}

impl From<&Args> for ExpectOption {
    fn from(args: &Args) -> Self {
        ExpectOption {
            ops_state: parse_ops_state(&args.exp_ops_state),
            network_disabled: parse_bool(&args.exp_network_disabled),
        }
    }
}

/// Splits a comma separated flag value. Only an empty value means "no list";
/// a blank token inside a given value is rejected instead of widening the selection.
fn split_list<'a>(flag: &str, raw: &'a str) -> Result<Vec<&'a str>, Error> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|token| {
            if token.trim().is_empty() {
                Err(Error::InvalidArgument(format!(
                    "--{} {:?} contains an empty entry",
                    flag, raw
                )))
            } else {
                Ok(token)
            }
        })
        .collect()
}

fn parse_ops_state(raw: &str) -> Option<OpsState> {
    (!raw.is_empty()).then(|| OpsState::from(raw))
}

/// Empty input leaves the flag unset, anything but "true" means false.
fn parse_bool(raw: &str) -> Option<bool> {
    (!raw.is_empty()).then(|| raw.eq_ignore_ascii_case("true"))
}

/// Parses `container/image` pairs. The image may itself contain `/`.
/// A container listed twice keeps the last image.
fn parse_container_images(raw: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut images = BTreeMap::new();
    for pair in split_list("select-not-container-image", raw)? {
        match pair.split_once('/') {
            Some((container, image)) if !container.is_empty() && !image.is_empty() => {
                images.insert(container.to_string(), image.to_string());
            }
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "invalid container image {:?}, expected <container>/<image>",
                    pair
                )))
            }
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["gs-updater", "--namespace", "default"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_leave_everything_unset() {
        let args = args(&[]);
        assert_eq!(args.timeout(), Duration::from_secs(300));
        assert_eq!(args.interval().unwrap(), Duration::from_secs(5));

        let select = SelectOption::try_from(&args).unwrap();
        assert_eq!(select.groups, GroupSelector::All);
        assert!(select.ids.is_empty());
        assert_eq!(select.ops_state, None);
        assert_eq!(select.network_disabled, None);
        assert!(select.not_container_image.is_empty());

        assert_eq!(ExpectOption::from(&args), ExpectOption::default());
    }

    #[test]
    fn namespace_is_required() {
        assert!(Args::try_parse_from(["gs-updater"]).is_err());
    }

    #[test]
    fn flag_names_match_the_documented_ones() {
        let args = args(&[
            "--gss-name",
            "a,b",
            "--timeout",
            "10",
            "--select-ids",
            "0,1",
            "--select-opsState",
            "Allocated",
            "--select-networkDisabled",
            "False",
            "--select-not-container-image",
            "game/game:v1",
            "--exp-opsState",
            "Maintaining",
            "--exp-networkDisabled",
            "TRUE",
        ]);

        let select = SelectOption::try_from(&args).unwrap();
        assert_eq!(
            select.groups,
            GroupSelector::Named(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(select.ids, vec![0, 1]);
        assert_eq!(select.ops_state, Some(OpsState::from("Allocated")));
        assert_eq!(select.network_disabled, Some(false));
        assert_eq!(select.not_container_image["game"], "game:v1");

        let expect = ExpectOption::from(&args);
        assert_eq!(expect.ops_state, Some(OpsState::from("Maintaining")));
        assert_eq!(expect.network_disabled, Some(true));
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        for raw in ["true", "True", "TRUE"] {
            assert_eq!(parse_bool(raw), Some(true), "{}", raw);
        }
        for raw in ["false", "yes", "1"] {
            assert_eq!(parse_bool(raw), Some(false), "{}", raw);
        }
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn invalid_ids_are_rejected() {
        for raw in ["-1", "x", "1,a"] {
            let flag = format!("--select-ids={}", raw);
            let result = SelectOption::try_from(&args(&[flag.as_str()]));
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "{}", raw);
        }
    }

    #[test]
    fn blank_list_entries_are_rejected() {
        let cases = [
            ("--select-ids", ","),
            ("--select-ids", " "),
            ("--select-ids", "1,,2"),
            ("--select-ids", " 3"),
            ("--gss-name", ","),
            ("--gss-name", "a,,b"),
            ("--select-not-container-image", ","),
            ("--select-not-container-image", "game/game:v1, "),
        ];
        for (flag, raw) in cases {
            let arg = format!("{}={}", flag, raw);
            let result = SelectOption::try_from(&args(&[arg.as_str()]));
            assert!(
                matches!(result, Err(Error::InvalidArgument(_))),
                "{} {:?}",
                flag,
                raw
            );
        }
    }

    #[test]
    fn blank_values_are_not_treated_as_unset() {
        let args = args(&[
            "--select-opsState= ",
            "--select-networkDisabled= ",
            "--exp-opsState= ",
            "--exp-networkDisabled= true",
        ]);

        let select = SelectOption::try_from(&args).unwrap();
        assert_eq!(select.ops_state, Some(OpsState::from(" ")));
        assert_eq!(select.network_disabled, Some(false));

        let expect = ExpectOption::from(&args);
        assert_eq!(expect.ops_state, Some(OpsState::from(" ")));
        assert_eq!(expect.network_disabled, Some(false));
    }

    #[test]
    fn ids_with_leading_zeros_select_the_plain_ordinal() {
        let select = SelectOption::try_from(&args(&["--select-ids", "07,0"])).unwrap();
        assert_eq!(select.ids, vec![7, 0]);
    }

    #[test]
    fn container_images_merge_and_keep_registry_paths() {
        let images = parse_container_images(
            "game/registry.example.com/team/game:v1,sidecar/envoy:1.20,game/game:v2",
        )
        .unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images["game"], "game:v2");
        assert_eq!(images["sidecar"], "envoy:1.20");
    }

    #[test]
    fn malformed_container_images_are_rejected() {
        for raw in ["game", "/game:v1", "game/"] {
            assert!(
                matches!(parse_container_images(raw), Err(Error::InvalidArgument(_))),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            args(&["--interval", "0"]).interval(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
