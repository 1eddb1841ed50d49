use std::sync::Arc;

use crate::{
    auth::jwt::JwtService, config::AppConfig, mailer::Mailer, store::SigningStore,
    tokens::TokenService, workflow::SigningWorkflow,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SigningStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SigningStore>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
        jwt: JwtService,
    ) -> Self {
        Self {
            store,
            mailer,
            config: Arc::new(config),
            jwt,
        }
    }

    pub fn token_service(&self) -> TokenService {
        TokenService::new(self.store.clone(), self.config.signing_token_validity_days)
    }

    pub fn workflow(&self) -> SigningWorkflow {
        SigningWorkflow::new(
            self.store.clone(),
            self.mailer.clone(),
            self.token_service(),
            self.config.public_origin.clone(),
        )
    }
}
