mod clusters;

use std::collections::{BTreeSet, HashMap};
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use trawl_config::load_workspace_config;
use trawl_core::{Identity, IdentityContext};
use trawl_fuzzy::{MetricIndex, min_distance};
use trawl_store::{NewUser, SqliteStore, Store};

use self::clusters::ClusterArena;
use crate::fragments::name_fragments;
use crate::settings::{EngineSettings, MatchSettings};
use crate::{AnalysisError, require_project};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub users: Vec<NewUser>,
    pub fuzzy_links: usize,
    pub email_merges: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterlinkOutcome {
    pub project: String,
    pub strategy: Option<String>,
    pub identities: usize,
    pub clusters: usize,
    pub fuzzy_links: usize,
    pub email_merges: usize,
    pub users_written: usize,
}

pub struct InterlinkAnalyzer {
    workspace: PathBuf,
    settings: EngineSettings,
}

impl InterlinkAnalyzer {
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let workspace = workspace.as_ref().to_path_buf();
        let config = load_workspace_config(&workspace)?;
        let settings = EngineSettings::from_config(&config)?;
        Ok(Self {
            workspace,
            settings,
        })
    }

    pub fn with_settings(workspace: impl AsRef<Path>, settings: EngineSettings) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn run(&self, project: &str) -> Result<InterlinkOutcome, AnalysisError> {
        let store = SqliteStore::open(&self.workspace)?;
        let project = require_project(&store, project)?;
        let identities = store.list_identities(project.id)?;

        let resolution = resolve_identities(
            &identities,
            self.settings.interlink.as_ref(),
            self.settings.merge_colocated,
        );
        let user_ids = store.replace_users(project.id, &resolution.users)?;

        info!(
            project = %project.name,
            identities = identities.len(),
            users = user_ids.len(),
            fuzzy_links = resolution.fuzzy_links,
            email_merges = resolution.email_merges,
            "interlinked identities"
        );

        Ok(InterlinkOutcome {
            project: project.name,
            strategy: self
                .settings
                .interlink
                .map(|matcher| matcher.strategy.as_str().to_owned()),
            identities: identities.len(),
            clusters: resolution.users.len(),
            fuzzy_links: resolution.fuzzy_links,
            email_merges: resolution.email_merges,
            users_written: user_ids.len(),
        })
    }
}

pub fn resolve_identities(
    identities: &[Identity],
    matcher: Option<&MatchSettings>,
    merge_colocated: bool,
) -> Resolution {
    let mut arena = ClusterArena::new(identities.len());

    let fuzzy_links = match matcher {
        Some(matcher) => {
            let codes = identities
                .iter()
                .map(|identity| encoded_fragments(identity, matcher))
                .collect::<Vec<_>>();
            FuzzyPass {
                identities,
                codes: &codes,
                matcher,
                merge_colocated,
            }
            .run(&mut arena)
        }
        None => 0,
    };

    arena.ensure_singletons();
    let email_merges = merge_by_email(identities, &mut arena);

    let users = arena
        .into_clusters()
        .into_iter()
        .map(|members| NewUser {
            name: user_name(members.iter().map(|&member| &identities[member])),
            identity_ids: members.iter().map(|&member| identities[member].id).collect(),
        })
        .collect();

    Resolution {
        users,
        fuzzy_links,
        email_merges,
    }
}

fn encoded_fragments(identity: &Identity, matcher: &MatchSettings) -> Vec<Vec<String>> {
    name_fragments(identity)
        .iter()
        .map(|fragment| matcher.encode(fragment))
        .filter(|codes| !codes.is_empty())
        .collect()
}

struct FuzzyPass<'a> {
    identities: &'a [Identity],
    codes: &'a [Vec<Vec<String>>],
    matcher: &'a MatchSettings,
    merge_colocated: bool,
}

impl FuzzyPass<'_> {
    fn run(&self, arena: &mut ClusterArena) -> usize {
        let mut index = MetricIndex::new();
        for (member, identity) in self.identities.iter().enumerate() {
            if identity.context != IdentityContext::Source {
                continue;
            }
            for code in self.codes[member].iter().flatten() {
                index.insert(code.as_str(), member);
            }
        }

        let bug_links = self.match_bug_identities(&index, arena);
        let source_links = self.match_source_identities(&index, arena);
        debug!(
            indexed_keys = index.len(),
            bug_links, source_links, "fuzzy name matching finished"
        );
        bug_links + source_links
    }

    fn match_bug_identities(&self, index: &MetricIndex<usize>, arena: &mut ClusterArena) -> usize {
        let threshold = self.matcher.distance;
        let mut links = 0;

        for (member, identity) in self.identities.iter().enumerate() {
            let fragments = &self.codes[member];
            if identity.context != IdentityContext::Bug || fragments.len() < 2 {
                continue;
            }

            let per_fragment = fragments
                .iter()
                .map(|codes| index.query_any(codes, threshold))
                .collect::<Vec<_>>();
            let mut candidates = BTreeSet::new();
            for (position, left) in per_fragment.iter().enumerate() {
                for right in &per_fragment[position + 1..] {
                    candidates.extend(left.intersection(right).copied());
                }
            }
            if candidates.is_empty() {
                continue;
            }

            let target = match candidates
                .iter()
                .find_map(|&candidate| arena.cluster_of(candidate))
            {
                Some(cluster) => cluster,
                None => arena.create(member),
            };
            if arena.join(member, target) {
                links += 1;
            }
            for candidate in candidates {
                if arena.join(candidate, target) {
                    links += 1;
                }
            }
            debug!(identity = identity.id, "bug identity matched source identities");
        }

        links
    }

    fn match_source_identities(
        &self,
        index: &MetricIndex<usize>,
        arena: &mut ClusterArena,
    ) -> usize {
        let threshold = self.matcher.distance;
        let mut links = 0;

        for node in index.iter() {
            let members = distinct(node.payload);
            for (_, neighbour) in index.query_nodes(node.key, threshold) {
                let colocated = neighbour.key == node.key;
                for &left in &members {
                    for right in distinct(neighbour.payload) {
                        if left == right || arena.same_cluster(left, right) {
                            continue;
                        }
                        let matched = (colocated && self.merge_colocated)
                            || self.remaining_fragments_match(
                                left,
                                node.key,
                                right,
                                neighbour.key,
                            );
                        if matched && arena.link(left, right) {
                            links += 1;
                        }
                    }
                }
            }
        }

        links
    }

    fn remaining_fragments_match(
        &self,
        left: usize,
        left_key: &str,
        right: usize,
        right_key: &str,
    ) -> bool {
        let left_fragments = &self.codes[left];
        let right_fragments = &self.codes[right];
        if left_fragments.len() < 2 || right_fragments.len() < 2 {
            return false;
        }

        let left_rest = without_key(left_fragments, left_key);
        let right_rest = without_key(right_fragments, right_key);
        left_rest.iter().any(|left_codes| {
            right_rest.iter().any(|right_codes| {
                min_distance(left_codes.as_slice(), right_codes.as_slice())
                    .is_some_and(|distance| distance <= self.matcher.distance)
            })
        })
    }
}

fn without_key<'a>(fragments: &'a [Vec<String>], key: &str) -> Vec<&'a Vec<String>> {
    let skip = fragments
        .iter()
        .position(|codes| codes.iter().any(|code| code == key));
    fragments
        .iter()
        .enumerate()
        .filter(|(position, _)| Some(*position) != skip)
        .map(|(_, codes)| codes)
        .collect()
}

fn distinct(payload: &[usize]) -> BTreeSet<usize> {
    payload.iter().copied().collect()
}

fn merge_by_email(identities: &[Identity], arena: &mut ClusterArena) -> usize {
    let mut owners: HashMap<String, usize> = HashMap::new();
    let mut merges = 0;

    for (member, identity) in identities.iter().enumerate() {
        let Some(email) = identity.match_email() else {
            continue;
        };
        match owners.entry(email) {
            Entry::Occupied(owner) => {
                if arena.link(*owner.get(), member) {
                    merges += 1;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(member);
            }
        }
    }

    merges
}

fn user_name<'a>(mut members: impl Iterator<Item = &'a Identity> + Clone) -> String {
    if let Some(name) = members.clone().find_map(|identity| identity.name.as_deref()) {
        return name.to_owned();
    }
    if let Some(email) = members.clone().find_map(|identity| identity.email.as_deref()) {
        return email.to_owned();
    }
    members
        .next()
        .map(|identity| format!("identity-{}", identity.id))
        .unwrap_or_default()
}
