//! Media library operations
//!
//! Every mutation opens a unit of work, resolves ownership inside it and only
//! then writes. Geocoding and file storage happen outside the transaction so a
//! slow collaborator never holds row locks.

use memoria_core::{
    models::{
        Collection, Coordinates, Item, ItemMetaUpdate, ItemWithTags, LocationInput, MapLocation,
        NameRequest, NewItemMeta, ResolvedLocation, StoredPayload, SubCollection,
        SubCollectionSummary, ThumbnailRef,
    },
    validation::{
        normalize_optional_text, normalize_tag_names, validate_request, MAX_DESCRIPTION_LENGTH,
        MAX_LOCATION_NAME_LENGTH,
    },
    AppError,
};
use memoria_db::{
    CollectionRepository, ItemRepository, OwnershipChain, SubCollectionRepository, TagRepository,
    UnitOfWork,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    AuthorizationResolver, Geocoder, SoftDeleteEngine, TagReconciler,
    UploadService,
};

/// Repositories and collaborators used by [`LibraryService`]
#[derive(Clone)]
pub struct LibraryParts {
    pub uow: UnitOfWork,
    pub authz: AuthorizationResolver,
    pub collections: CollectionRepository,
    pub sub_collections: SubCollectionRepository,
    pub items: ItemRepository,
    pub tags: TagRepository,
    pub soft_delete: SoftDeleteEngine,
    pub uploads: UploadService,
    pub geocoder: Arc<dyn Geocoder>,
    pub geocode_timeout: Duration,
}

#[derive(Clone)]
pub struct LibraryService {
    uow: UnitOfWork,
    authz: AuthorizationResolver,
    collections: CollectionRepository,
    sub_collections: SubCollectionRepository,
    items: ItemRepository,
    tags: TagRepository,
    reconciler: TagReconciler,
    soft_delete: SoftDeleteEngine,
    uploads: UploadService,
    geocoder: Arc<dyn Geocoder>,
    geocode_timeout: Duration,
}

impl LibraryService {
    pub fn new(parts: LibraryParts) -> Self {
        Self {
            reconciler: TagReconciler::new(parts.tags.clone()),
            uow: parts.uow,
            authz: parts.authz,
            collections: parts.collections,
            sub_collections: parts.sub_collections,
            items: parts.items,
            tags: parts.tags,
            soft_delete: parts.soft_delete,
            uploads: parts.uploads,
            geocoder: parts.geocoder,
            geocode_timeout: parts.geocode_timeout,
        }
    }

    // Collections

    #[tracing::instrument(skip(self, name))]
    pub async fn create_collection(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> Result<Collection, AppError> {
        let request = NameRequest::new(name);
        validate_request(&request)?;

        let mut tx = self.uow.begin("create_collection").await?;
        let result = self
            .collections
            .insert_with_quota_tx(tx.tx(), account_id, &request.name)
            .await;
        let collection = tx.finish(result).await?;

        tracing::info!(collection_id = %collection.id, "Collection created");
        Ok(collection)
    }

    pub async fn list_collections(&self, account_id: Uuid) -> Result<Vec<Collection>, AppError> {
        self.collections
            .list_for_account(account_id)
            .await
            .map_err(AppError::classify)
    }

    #[tracing::instrument(skip(self, name))]
    pub async fn rename_collection(
        &self,
        account_id: Uuid,
        collection_id: Uuid,
        name: &str,
    ) -> Result<Collection, AppError> {
        let request = NameRequest::new(name);
        validate_request(&request)?;

        let mut tx = self.uow.begin("rename_collection").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Collection(collection_id),
                )
                .await?;
            self.collections
                .rename_tx(tx.tx(), collection_id, &request.name)
                .await?
                .ok_or_else(|| AppError::Conflict("Collection was deleted".to_string()))
        }
        .await;
        tx.finish(result).await
    }

    /// Soft-delete a collection together with its live sub-collections.
    #[tracing::instrument(skip(self))]
    pub async fn delete_collection(
        &self,
        account_id: Uuid,
        collection_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.uow.begin("delete_collection").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Collection(collection_id),
                )
                .await?;
            self.soft_delete
                .soft_delete_collection_tx(tx.tx(), collection_id)
                .await
        }
        .await;
        tx.finish(result).await
    }

    // Sub-collections

    #[tracing::instrument(skip(self, name))]
    pub async fn create_sub_collection(
        &self,
        account_id: Uuid,
        collection_id: Uuid,
        name: &str,
    ) -> Result<SubCollection, AppError> {
        let request = NameRequest::new(name);
        validate_request(&request)?;

        let mut tx = self.uow.begin("create_sub_collection").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Collection(collection_id),
                )
                .await?;
            self.sub_collections
                .insert_with_quota_tx(tx.tx(), collection_id, &request.name)
                .await
        }
        .await;
        let sub_collection = tx.finish(result).await?;

        tracing::info!(sub_collection_id = %sub_collection.id, "Sub-collection created");
        Ok(sub_collection)
    }

    pub async fn list_sub_collections(
        &self,
        account_id: Uuid,
        collection_id: Uuid,
    ) -> Result<Vec<SubCollectionSummary>, AppError> {
        self.authz
            .resolve_ownership(account_id, OwnershipChain::Collection(collection_id))
            .await
            .map_err(AppError::classify)?;

        self.sub_collections
            .list_summaries(collection_id)
            .await
            .map_err(AppError::classify)
    }

    #[tracing::instrument(skip(self, name))]
    pub async fn rename_sub_collection(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        name: &str,
    ) -> Result<SubCollection, AppError> {
        let request = NameRequest::new(name);
        validate_request(&request)?;

        let mut tx = self.uow.begin("rename_sub_collection").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::SubCollection(sub_collection_id),
                )
                .await?;
            self.sub_collections
                .rename_tx(tx.tx(), sub_collection_id, &request.name)
                .await?
                .ok_or_else(|| AppError::Conflict("Sub-collection was deleted".to_string()))
        }
        .await;
        tx.finish(result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn soft_delete_sub_collection(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.uow.begin("soft_delete_sub_collection").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::SubCollection(sub_collection_id),
                )
                .await?;
            self.soft_delete
                .soft_delete_sub_collection_tx(tx.tx(), sub_collection_id)
                .await
        }
        .await;
        tx.finish(result).await
    }

    // Items

    /// Attach already-stored content to a sub-collection.
    #[tracing::instrument(skip(self, payload, meta), fields(storage_key = %payload.storage_key))]
    pub async fn add_item(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        payload: StoredPayload,
        meta: NewItemMeta,
    ) -> Result<Item, AppError> {
        let description =
            normalize_optional_text("description", meta.description, MAX_DESCRIPTION_LENGTH)?;
        let tags = normalize_tag_names(&meta.tags)?;
        let location = self.resolve_location(meta.location).await?;

        let mut tx = self.uow.begin("add_item").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::SubCollection(sub_collection_id),
                )
                .await?;
            let item = self
                .items
                .insert_tx(
                    tx.tx(),
                    sub_collection_id,
                    &payload,
                    description.as_deref(),
                    &location,
                )
                .await?;
            self.reconciler
                .reconcile_tags_tx(tx.tx(), item.id, &tags)
                .await?;
            Ok(item)
        }
        .await;
        let item = tx.finish(result).await?;

        tracing::info!(item_id = %item.id, tags = tags.len(), "Item added");
        Ok(item)
    }

    /// Store an upload and add it as an item. The stored object is removed again
    /// if the item cannot be created.
    #[tracing::instrument(skip(self, data, meta), fields(size_bytes = data.len()))]
    pub async fn upload_item(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
        meta: NewItemMeta,
    ) -> Result<Item, AppError> {
        self.authz
            .resolve_ownership(account_id, OwnershipChain::SubCollection(sub_collection_id))
            .await
            .map_err(AppError::classify)?;

        let payload = self
            .uploads
            .store(account_id, original_name, mime_type, data)
            .await?;
        let storage_key = payload.storage_key.clone();

        match self
            .add_item(account_id, sub_collection_id, payload, meta)
            .await
        {
            Ok(item) => Ok(item),
            Err(e) => {
                self.uploads.discard(&storage_key).await;
                Err(e)
            }
        }
    }

    /// Overwrite description and location; replace tags when `update.tags` is set.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_item_meta(
        &self,
        account_id: Uuid,
        item_id: Uuid,
        update: ItemMetaUpdate,
    ) -> Result<(), AppError> {
        let description =
            normalize_optional_text("description", update.description, MAX_DESCRIPTION_LENGTH)?;
        let tags = update
            .tags
            .map(|names| normalize_tag_names(&names))
            .transpose()?;
        let location = self.resolve_location(update.location).await?;

        let mut tx = self.uow.begin("update_item_meta").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Item(item_id),
                )
                .await?;
            if self
                .items
                .update_meta_tx(tx.tx(), item_id, description.as_deref(), &location)
                .await?
                == 0
            {
                return Err(AppError::Conflict("Item was deleted".to_string()));
            }
            if let Some(tags) = &tags {
                self.reconciler
                    .reconcile_tags_tx(tx.tx(), item_id, tags)
                    .await?;
            }
            Ok(())
        }
        .await;
        tx.finish(result).await
    }

    /// Set or clear an item's coordinates directly, e.g. after a pin is dragged on the map.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_coordinates(
        &self,
        account_id: Uuid,
        item_id: Uuid,
        coordinates: Option<Coordinates>,
    ) -> Result<(), AppError> {
        if coordinates.is_some_and(|c| !c.is_valid()) {
            return Err(AppError::InvalidInput(
                "Coordinates are out of range".to_string(),
            ));
        }

        let mut tx = self.uow.begin("update_item_coordinates").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Item(item_id),
                )
                .await?;
            let updated = self
                .items
                .update_coordinates_tx(
                    tx.tx(),
                    item_id,
                    coordinates.map(|c| c.latitude),
                    coordinates.map(|c| c.longitude),
                )
                .await?;
            if updated == 0 {
                return Err(AppError::Conflict("Item was deleted".to_string()));
            }
            Ok(())
        }
        .await;
        tx.finish(result).await
    }

    /// Replace an item's tag set. Returns the normalized names now attached.
    #[tracing::instrument(skip(self, names))]
    pub async fn reconcile_tags(
        &self,
        account_id: Uuid,
        item_id: Uuid,
        names: &[String],
    ) -> Result<Vec<String>, AppError> {
        let names = normalize_tag_names(names)?;

        let mut tx = self.uow.begin("reconcile_tags").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Item(item_id),
                )
                .await?;
            self.reconciler
                .reconcile_tags_tx(tx.tx(), item_id, &names)
                .await
        }
        .await;
        tx.finish(result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn soft_delete_item(&self, account_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.uow.begin("soft_delete_item").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::Item(item_id),
                )
                .await?;
            self.soft_delete.soft_delete_item_tx(tx.tx(), item_id).await
        }
        .await;
        tx.finish(result).await
    }

    /// Live items of a sub-collection with their tags; the thumbnail item is left out.
    pub async fn list_items(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
    ) -> Result<Vec<ItemWithTags>, AppError> {
        self.authz
            .resolve_ownership(account_id, OwnershipChain::SubCollection(sub_collection_id))
            .await
            .map_err(AppError::classify)?;

        let items = self
            .items
            .list_gallery(sub_collection_id)
            .await
            .map_err(AppError::classify)?;
        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let mut tags_by_item: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (item_id, name) in self
            .tags
            .names_for_items(&ids)
            .await
            .map_err(AppError::classify)?
        {
            tags_by_item.entry(item_id).or_default().push(name);
        }

        Ok(items
            .into_iter()
            .map(|item| ItemWithTags {
                tags: tags_by_item.remove(&item.id).unwrap_or_default(),
                item,
            })
            .collect())
    }

    pub async fn item_tags(&self, account_id: Uuid, item_id: Uuid) -> Result<Vec<String>, AppError> {
        self.authz
            .resolve_ownership(account_id, OwnershipChain::Item(item_id))
            .await
            .map_err(AppError::classify)?;
        self.reconciler
            .names_for_item(item_id)
            .await
            .map_err(AppError::classify)
    }

    /// Point a sub-collection's thumbnail at one of its live items.
    #[tracing::instrument(skip(self))]
    pub async fn set_thumbnail(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        item_id: Uuid,
    ) -> Result<ThumbnailRef, AppError> {
        let mut tx = self.uow.begin("set_thumbnail").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::SubCollection(sub_collection_id),
                )
                .await?;

            let item = self
                .items
                .get_tx(tx.tx(), item_id)
                .await?
                .filter(|item| item.sub_collection_id == sub_collection_id)
                .ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "item {} does not belong to sub-collection {}",
                        item_id, sub_collection_id
                    ))
                })?;
            if item.is_deleted {
                return Err(AppError::Conflict("Thumbnail item was deleted".to_string()));
            }

            if self
                .sub_collections
                .set_thumbnail_tx(tx.tx(), sub_collection_id, item_id)
                .await?
                == 0
            {
                return Err(AppError::Conflict("Thumbnail item was deleted".to_string()));
            }

            Ok(ThumbnailRef {
                sub_collection_id,
                item_id,
                url: item.url,
                replaced: false,
            })
        }
        .await;
        tx.finish(result).await
    }

    /// Install new thumbnail content for a sub-collection.
    ///
    /// An existing thumbnail item is updated in place and its previous object is
    /// deleted after commit. Otherwise a new item is inserted and referenced.
    #[tracing::instrument(skip(self, payload), fields(storage_key = %payload.storage_key))]
    pub async fn replace_thumbnail(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        payload: StoredPayload,
    ) -> Result<ThumbnailRef, AppError> {
        let mut tx = self.uow.begin("replace_thumbnail").await?;
        let result = async {
            self.authz
                .resolve_ownership_tx(
                    tx.tx(),
                    account_id,
                    OwnershipChain::SubCollection(sub_collection_id),
                )
                .await?;

            let sub_collection = self
                .sub_collections
                .get_tx(tx.tx(), sub_collection_id)
                .await?
                .ok_or_else(|| AppError::Conflict("Sub-collection was deleted".to_string()))?;

            let current = match sub_collection.thumbnail_item_id {
                Some(thumbnail_id) => self
                    .items
                    .get_tx(tx.tx(), thumbnail_id)
                    .await?
                    .filter(|item| !item.is_deleted),
                None => None,
            };

            match current {
                Some(existing) => {
                    if self
                        .items
                        .replace_file_tx(tx.tx(), existing.id, &payload)
                        .await?
                        == 0
                    {
                        return Err(AppError::Conflict(
                            "Thumbnail item was deleted".to_string(),
                        ));
                    }
                    Ok((
                        ThumbnailRef {
                            sub_collection_id,
                            item_id: existing.id,
                            url: payload.url.clone(),
                            replaced: true,
                        },
                        Some(existing.storage_key),
                    ))
                }
                None => {
                    let item = self
                        .items
                        .insert_tx(
                            tx.tx(),
                            sub_collection_id,
                            &payload,
                            None,
                            &ResolvedLocation::default(),
                        )
                        .await?;
                    if self
                        .sub_collections
                        .set_thumbnail_tx(tx.tx(), sub_collection_id, item.id)
                        .await?
                        == 0
                    {
                        return Err(AppError::Conflict(
                            "Sub-collection was deleted".to_string(),
                        ));
                    }
                    Ok((
                        ThumbnailRef {
                            sub_collection_id,
                            item_id: item.id,
                            url: item.url,
                            replaced: false,
                        },
                        None,
                    ))
                }
            }
        }
        .await;
        let (thumbnail, previous_key) = tx.finish(result).await?;

        if let Some(key) = previous_key.filter(|key| *key != payload.storage_key) {
            self.uploads.discard(&key).await;
        }

        tracing::info!(
            item_id = %thumbnail.item_id,
            replaced = thumbnail.replaced,
            "Thumbnail installed"
        );
        Ok(thumbnail)
    }

    /// Store an uploaded image and install it as the sub-collection's thumbnail.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn upload_thumbnail(
        &self,
        account_id: Uuid,
        sub_collection_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ThumbnailRef, AppError> {
        self.authz
            .resolve_ownership(account_id, OwnershipChain::SubCollection(sub_collection_id))
            .await
            .map_err(AppError::classify)?;

        let payload = self
            .uploads
            .store(account_id, original_name, mime_type, data)
            .await?;
        let storage_key = payload.storage_key.clone();

        match self
            .replace_thumbnail(account_id, sub_collection_id, payload)
            .await
        {
            Ok(thumbnail) => Ok(thumbnail),
            Err(e) => {
                self.uploads.discard(&storage_key).await;
                Err(e)
            }
        }
    }

    pub async fn list_map_locations(&self, account_id: Uuid) -> Result<Vec<MapLocation>, AppError> {
        self.items
            .list_map_locations(account_id)
            .await
            .map_err(AppError::classify)
    }

    /// Normalize a location and fill in missing coordinates from the geocoder.
    ///
    /// Runs before any transaction. Geocoding is bounded by `geocode_timeout`
    /// and its failure only leaves the coordinates empty.
    async fn resolve_location(
        &self,
        location: Option<LocationInput>,
    ) -> Result<ResolvedLocation, AppError> {
        let Some(location) = location else {
            return Ok(ResolvedLocation::default());
        };

        let name = normalize_optional_text(
            "location name",
            Some(location.name),
            MAX_LOCATION_NAME_LENGTH,
        )?;

        if let Some(coordinates) = location.coordinates {
            if !coordinates.is_valid() {
                return Err(AppError::InvalidInput(
                    "Coordinates are out of range".to_string(),
                ));
            }
            return Ok(ResolvedLocation {
                name,
                coordinates: Some(coordinates),
            });
        }

        let coordinates = match &name {
            Some(place) => {
                match tokio::time::timeout(self.geocode_timeout, self.geocoder.geocode(place))
                    .await
                {
                    Ok(coordinates) => coordinates,
                    Err(_) => {
                        tracing::warn!(place = %place, "Geocoding timed out");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(ResolvedLocation { name, coordinates })
    }
}
