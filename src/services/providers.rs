//! Provider catalog service

use crate::{
    error::AppResult,
    models::provider::{CreateProvider, Provider, ProviderQuery, UpdateProvider},
    repository::Repository,
};

#[derive(Clone)]
pub struct ProvidersService {
    repository: Repository,
}

impl ProvidersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, input: &CreateProvider) -> AppResult<Provider> {
        let data = input.normalize()?;
        let provider = self.repository.providers.create(&data).await?;
        tracing::info!("Created provider {} ({})", provider.name, provider.id);
        Ok(provider)
    }

    pub async fn get(&self, id: i32) -> AppResult<Provider> {
        self.repository.providers.get_by_id(id).await
    }

    pub async fn list(&self, query: &ProviderQuery) -> AppResult<Vec<Provider>> {
        self.repository.providers.list(query).await
    }

    pub async fn update(&self, id: i32, input: &UpdateProvider) -> AppResult<Provider> {
        let current = self.repository.providers.get_by_id(id).await?;
        let data = input.merge_into(&current)?;
        self.repository.providers.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.providers.delete(id).await?;
        tracing::info!("Deleted provider {}", id);
        Ok(())
    }
}
