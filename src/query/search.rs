// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pattern search over the scene tree with pagination.

use serde::Deserialize;
use thiserror::Error;

use super::glob::Glob;
use crate::host::{EditorHost, HostError};
use crate::model::{SearchMatch, SearchPage, TreeNode};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("at least one of namePattern, componentType or pathPattern is required")]
    NoFilter,
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Search arguments as a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub name_pattern: Option<String>,
    pub component_type: Option<String>,
    pub path_pattern: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchRequest {
    /// Compiles the patterns and clamps the page window. Empty strings count as
    /// absent filters.
    pub fn into_query(self) -> Result<SearchQuery, SearchError> {
        let name = compile(self.name_pattern)?;
        let path = compile(self.path_pattern)?;
        let component_type = self
            .component_type
            .filter(|component| !component.is_empty())
            .map(|component| component.to_lowercase());
        if name.is_none() && path.is_none() && component_type.is_none() {
            return Err(SearchError::NoFilter);
        }

        let limit = match self.limit {
            Some(limit) => usize::try_from(limit.max(1)).unwrap_or(MAX_LIMIT).min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };
        let offset = self.offset.map_or(0, |offset| usize::try_from(offset.max(0)).unwrap_or(usize::MAX));
        Ok(SearchQuery { name, component_type, path, limit, offset })
    }
}

fn compile(pattern: Option<String>) -> Result<Option<Glob>, SearchError> {
    match pattern.filter(|pattern| !pattern.is_empty()) {
        Some(pattern) => Glob::new(&pattern)
            .map(Some)
            .map_err(|source| SearchError::InvalidPattern { pattern, source }),
        None => Ok(None),
    }
}

/// A validated search. At least one filter is always present.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    name: Option<Glob>,
    component_type: Option<String>,
    path: Option<Glob>,
    limit: usize,
    offset: usize,
}

impl SearchQuery {
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn matches_tree_entry(&self, name: &str, path: &str) -> bool {
        self.name.as_ref().map_or(true, |glob| glob.is_match(name))
            && self.path.as_ref().map_or(true, |glob| glob.is_match(path))
    }
}

struct Candidate<'a> {
    node: &'a TreeNode,
    path: String,
}

/// Every node below the scene root in pre-order, each with its slash-joined path.
fn walk(root: &TreeNode) -> Vec<Candidate<'_>> {
    let mut out = Vec::new();
    let mut stack: Vec<(&TreeNode, String)> = root
        .children
        .iter()
        .rev()
        .map(|child| (child, child.name.clone()))
        .collect();
    while let Some((node, path)) = stack.pop() {
        stack.extend(
            node.children.iter().rev().map(|child| (child, format!("{path}/{}", child.name))),
        );
        out.push(Candidate { node, path });
    }
    out
}

fn window(total: usize, offset: usize, limit: usize) -> (usize, usize) {
    let start = offset.min(total);
    (start, (start + limit).min(total))
}

pub struct NodeSearchEngine<'a, H> {
    host: &'a H,
}

impl<'a, H: EditorHost> NodeSearchEngine<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
        let tree = self.host.node_tree().await?;
        let candidates = walk(&tree)
            .into_iter()
            .filter(|candidate| query.matches_tree_entry(&candidate.node.name, &candidate.path))
            .collect::<Vec<_>>();

        let (results, total) = match &query.component_type {
            Some(component) => {
                let mut matched = Vec::new();
                for candidate in candidates {
                    let components = self.components_of(candidate.node).await;
                    if components.iter().any(|ty| ty.to_lowercase().contains(component.as_str())) {
                        matched.push(search_match(candidate, components));
                    }
                }
                let total = matched.len();
                let (start, end) = window(total, query.offset, query.limit);
                (matched.drain(start..end).collect::<Vec<_>>(), total)
            }
            None => {
                let total = candidates.len();
                let (start, end) = window(total, query.offset, query.limit);
                let mut page = Vec::with_capacity(end - start);
                for candidate in candidates.into_iter().skip(start).take(end - start) {
                    let components = self.components_of(candidate.node).await;
                    page.push(search_match(candidate, components));
                }
                (page, total)
            }
        };

        let offset = query.offset.min(total);
        Ok(SearchPage {
            has_more: offset + results.len() < total,
            results,
            total,
            offset,
            limit: query.limit,
        })
    }

    async fn components_of(&self, node: &TreeNode) -> Vec<String> {
        match self.host.node_details(&node.uuid).await {
            Ok(details) => details.component_types(),
            Err(err) => {
                tracing::warn!(uuid = %node.uuid, %err, "node details unavailable during search");
                Vec::new()
            }
        }
    }
}

fn search_match(candidate: Candidate<'_>, components: Vec<String>) -> SearchMatch {
    SearchMatch {
        uuid: candidate.node.uuid.to_string(),
        name: candidate.node.name.clone(),
        path: candidate.path,
        components,
    }
}
