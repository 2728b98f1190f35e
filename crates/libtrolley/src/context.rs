// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    Config,
    loader::{StoreLoader, TagLoader},
    service::{Services, Session},
};

/// record kinds whose changes invalidate cached lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    Store,
    Tag,
}

/// everything one request needs: caller, services, settings and its loaders.
pub struct RequestContext {
    pub session: Session,
    pub services: Services,
    pub config: Config,
    pub stores: StoreLoader,
    pub tags: TagLoader,
}

impl RequestContext {
    pub fn new(session: Session, services: Services, config: Config) -> Self {
        let token = session.token.clone();
        Self {
            stores: StoreLoader::stores(services.stores.clone(), token.clone()),
            tags: TagLoader::tags(services.tags.clone(), token),
            session,
            services,
            config,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    /// drops every cached lookup of the changed kind.
    pub fn on_record_changed(&self, change: RecordChange) {
        log::debug!("**context:** {change:?} changed, clearing loader cache");
        match change {
            RecordChange::Store => self.stores.clear_all(),
            RecordChange::Tag => self.tags.clear_all(),
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
