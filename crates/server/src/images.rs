//! Image lifecycle: temp upload, finalize into the permanent area, cleanup.
//!
//! A room's `image_url` must always be empty or point at a file that exists
//! in the permanent area. Finalize is the only writer of `image_url`, and it
//! keeps that rule through failures with a claim/rollback protocol:
//!
//! 1. The temp file is claimed by renaming it to a hidden name inside the
//!    temp area. The rename is atomic, so exactly one concurrent finalize of
//!    the same upload wins; the others see `TempAssetMissing`.
//! 2. The claimed bytes are written to the permanent area.
//! 3. The room row is updated.
//! 4. The claim is deleted.
//!
//! A failure in step 2 renames the claim back. A failure in step 3 also
//! deletes the permanent copy. Either way the upload can be finalized again
//! and no unreferenced permanent file is left behind.
//!
//! Finalize runs as its own task, so a caller that goes away mid-flight does
//! not stop it between the claim and its release. Claims that are still on
//! disk without a finalize working on them (after a crash, or a failed
//! delete) are recovered by [`ImageLifecycle::recover_claims`].

use crate::metrics;
use crate::state::RoomLocks;
use bytes::Bytes;
use lodge_core::config::ImagesConfig;
use lodge_core::image::{is_image_content_type, permanent_file_name};
use lodge_core::room::date_stamp;
use lodge_core::{Error, ImageUploadState, PermanentImageRef, Result, Room, TempImageRef};
use lodge_metadata::MetadataStore;
use lodge_storage::{ObjectStore, StorageError};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Prefix of claimed temp files. Hidden keys never show up in listings.
const CLAIM_PREFIX: &str = ".claim.";

/// Attempts at finding an unused permanent name before giving up.
const PERMANENT_NAME_ATTEMPTS: usize = 5;

/// An upload stored in the temp area.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub reference: TempImageRef,
    pub url: String,
    pub size: usize,
}

/// A successfully finalized upload.
#[derive(Debug, Clone)]
pub struct FinalizedImage {
    pub permanent: PermanentImageRef,
    pub url: String,
    pub room: Room,
}

/// Result of an orphan sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanSweep {
    /// Files in the permanent area when the sweep started.
    pub scanned: usize,
    /// Files deleted.
    pub deleted: Vec<String>,
    /// Files that could not be deleted.
    pub failed: Vec<String>,
    /// Stale claims put back in the temp area.
    pub claims_restored: Vec<String>,
    /// Claims of finished finalizes removed from the temp area.
    pub claims_deleted: Vec<String>,
}

/// Result of [`ImageLifecycle::recover_claims`].
#[derive(Debug, Clone, Default)]
pub struct ClaimRecovery {
    /// Temp names made available again.
    pub restored: Vec<String>,
    /// Claim keys deleted.
    pub deleted: Vec<String>,
}

/// Claims known to this process.
#[derive(Default)]
struct ClaimBook {
    /// Claims a running finalize owns.
    active: HashSet<String>,
    /// Claims of successful finalizes whose delete failed.
    finished: HashSet<String>,
}

/// Marks a claim as owned by a running finalize until dropped.
struct ActiveClaim<'a> {
    book: &'a Mutex<ClaimBook>,
    key: String,
}

impl<'a> ActiveClaim<'a> {
    fn register(book: &'a Mutex<ClaimBook>, key: String) -> Self {
        lock_book(book).active.insert(key.clone());
        Self { book, key }
    }

    fn key(&self) -> &str {
        &self.key
    }

    /// Leave the claim for the next recovery to delete.
    fn mark_finished(&self) {
        lock_book(self.book).finished.insert(self.key.clone());
    }
}

impl Drop for ActiveClaim<'_> {
    fn drop(&mut self) {
        lock_book(self.book).active.remove(&self.key);
    }
}

fn lock_book(book: &Mutex<ClaimBook>) -> std::sync::MutexGuard<'_, ClaimBook> {
    book.lock().unwrap_or_else(|e| e.into_inner())
}

enum ClaimAction {
    Skip,
    Delete,
    Restore,
}

/// Orchestrates the temp and permanent image areas and the room store.
pub struct ImageLifecycle {
    config: ImagesConfig,
    temp: Arc<dyn ObjectStore>,
    permanent: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    locks: RoomLocks,
    claims: Mutex<ClaimBook>,
}

impl ImageLifecycle {
    pub fn new(
        config: ImagesConfig,
        temp: Arc<dyn ObjectStore>,
        permanent: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config,
            temp,
            permanent,
            metadata,
            locks: RoomLocks::new(),
            claims: Mutex::new(ClaimBook::default()),
        }
    }

    pub fn config(&self) -> &ImagesConfig {
        &self.config
    }

    pub fn temp_area(&self) -> &Arc<dyn ObjectStore> {
        &self.temp
    }

    pub fn permanent_area(&self) -> &Arc<dyn ObjectStore> {
        &self.permanent
    }

    /// Store an upload in the temp area under a freshly generated name.
    ///
    /// Nothing is written when the upload is rejected.
    pub async fn store_temp(
        &self,
        data: Bytes,
        content_type: &str,
        original_filename: &str,
    ) -> Result<StoredUpload> {
        if !is_image_content_type(content_type) {
            metrics::record_upload_rejected("content_type");
            return Err(Error::InvalidMediaType(content_type.to_string()));
        }
        if data.is_empty() {
            metrics::record_upload_rejected("empty");
            return Err(Error::Validation("uploaded image is empty".to_string()));
        }
        if self.config.verify_magic_bytes
            && let Some(kind) = infer::get(&data)
            && !kind.mime_type().starts_with("image/")
        {
            metrics::record_upload_rejected("magic_bytes");
            return Err(Error::InvalidMediaType(kind.mime_type().to_string()));
        }

        let reference = TempImageRef::generate(original_filename);
        let size = data.len();
        self.temp.put(reference.file_name(), data).await?;

        metrics::IMAGE_UPLOADS.inc();
        metrics::IMAGE_UPLOAD_BYTES.inc_by(size as u64);
        metrics::record_transition(ImageUploadState::Uploaded);
        tracing::info!(
            file_name = %reference,
            size,
            state = ImageUploadState::Uploaded.as_str(),
            "Stored temp image"
        );

        Ok(StoredUpload {
            url: reference.url(&self.config.temp_url_prefix),
            reference,
            size,
        })
    }

    /// Attach a temp upload to a room.
    ///
    /// `reference` may be the public temp URL or the bare file name. The work
    /// runs on a spawned task and completes even if this future is dropped.
    pub async fn finalize(
        self: &Arc<Self>,
        room_id: i64,
        reference: &str,
    ) -> Result<FinalizedImage> {
        let this = Arc::clone(self);
        let reference = reference.to_string();
        let task =
            tokio::spawn(async move { this.finalize_recorded(room_id, &reference).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(room_id, error = %e, "Finalize task failed");
                Err(Error::StorageIo(format!("finalize task failed: {e}")))
            }
        }
    }

    async fn finalize_recorded(&self, room_id: i64, reference: &str) -> Result<FinalizedImage> {
        let start = Instant::now();

        // Finalizes share the room unless serialized; the orphan sweep always
        // takes it exclusively.
        let result = {
            let _guard = if self.config.serialize_finalize {
                self.locks.acquire(room_id).await
            } else {
                self.locks.share(room_id).await
            };
            self.finalize_held(room_id, reference).await
        };

        metrics::FINALIZE_DURATION.observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(done) => {
                metrics::record_finalize("ok");
                metrics::record_transition(ImageUploadState::Finalized);
                tracing::info!(
                    room_id,
                    image = %done.permanent,
                    state = ImageUploadState::Finalized.as_str(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Finalized room image"
                );
            }
            Err(e) => {
                metrics::record_finalize(finalize_outcome(e));
                tracing::warn!(room_id, reference, error = %e, "Finalize failed");
            }
        }
        result
    }

    async fn finalize_held(&self, room_id: i64, reference: &str) -> Result<FinalizedImage> {
        let previous = self
            .metadata
            .get_room(room_id)
            .await?
            .ok_or(Error::RoomNotFound(room_id))?;

        let temp_ref = TempImageRef::resolve(reference, &self.config.temp_url_prefix)?;
        let active = ActiveClaim::register(&self.claims, claim_key(&temp_ref));
        let claim = active.key();
        match self.temp.rename(temp_ref.file_name(), claim).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                return Err(Error::TempAssetMissing(temp_ref.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let permanent = match self.copy_claim(room_id, &temp_ref, claim).await {
            Ok(permanent) => permanent,
            Err(e) => {
                self.release_claim(claim, &temp_ref).await;
                return Err(e);
            }
        };

        let url = permanent.url(&self.config.permanent_url_prefix);
        let updated_at = date_stamp(OffsetDateTime::now_utc());
        let room = match self
            .metadata
            .set_room_image(room_id, &url, Some(updated_at.as_str()))
            .await
        {
            Ok(Some(row)) => Room::from(row),
            Ok(None) => {
                self.rollback(claim, &temp_ref, &permanent).await;
                return Err(Error::RoomNotFound(room_id));
            }
            Err(e) => {
                self.rollback(claim, &temp_ref, &permanent).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.temp.delete(claim).await {
            tracing::warn!(claim = %claim, error = %e, "Failed to delete finalized claim");
            active.mark_finished();
        }

        if self.config.prune_replaced_images
            && let Some(old_url) = previous.image_url.as_deref()
        {
            self.prune_replaced(old_url, &permanent).await;
        }

        Ok(FinalizedImage {
            permanent,
            url,
            room,
        })
    }

    /// Copy a claimed upload into the permanent area.
    async fn copy_claim(
        &self,
        room_id: i64,
        temp_ref: &TempImageRef,
        claim: &str,
    ) -> Result<PermanentImageRef> {
        let permanent = self.unused_permanent_name(room_id, temp_ref.extension()).await?;
        let data = self.temp.get(claim).await?;
        self.permanent.put(permanent.file_name(), data).await?;
        Ok(permanent)
    }

    /// Names are millisecond-based; back-to-back finalizes of one room may collide.
    async fn unused_permanent_name(
        &self,
        room_id: i64,
        ext: Option<&str>,
    ) -> Result<PermanentImageRef> {
        for _ in 0..PERMANENT_NAME_ATTEMPTS {
            let candidate = PermanentImageRef::for_room(room_id, ext);
            if !self.permanent.exists(candidate.file_name()).await? {
                return Ok(candidate);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Err(Error::StorageIo(format!(
            "no free permanent name for room {room_id}"
        )))
    }

    /// Put a claimed upload back under its temp name.
    async fn release_claim(&self, claim: &str, temp_ref: &TempImageRef) {
        if let Err(e) = self.temp.rename(claim, temp_ref.file_name()).await {
            tracing::error!(
                claim = %claim,
                file_name = %temp_ref,
                error = %e,
                "Failed to restore claimed temp image"
            );
        }
    }

    /// Undo a permanent write whose room update did not happen.
    async fn rollback(&self, claim: &str, temp_ref: &TempImageRef, permanent: &PermanentImageRef) {
        metrics::FINALIZE_ROLLBACKS.inc();
        match self.permanent.delete(permanent.file_name()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::error!(
                image = %permanent,
                error = %e,
                "Failed to delete permanent image during rollback"
            ),
        }
        self.release_claim(claim, temp_ref).await;
        tracing::warn!(file_name = %temp_ref, image = %permanent, "Rolled back finalize");
    }

    async fn prune_replaced(&self, old_url: &str, current: &PermanentImageRef) {
        let Some(old_name) = permanent_file_name(old_url, &self.config.permanent_url_prefix) else {
            return;
        };
        if old_name == current.file_name() {
            return;
        }
        match self.permanent.delete(old_name).await {
            Ok(()) => tracing::info!(image = %old_name, "Pruned replaced room image"),
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(image = %old_name, error = %e, "Failed to prune replaced image"),
        }
    }

    /// Discard an unfinalized upload.
    ///
    /// Idempotent: references that are malformed or already gone are a
    /// successful no-op. Returns whether a file was deleted.
    pub async fn cleanup(&self, reference: &str) -> Result<bool> {
        let temp_ref = match TempImageRef::resolve(reference, &self.config.temp_url_prefix) {
            Ok(temp_ref) => temp_ref,
            Err(_) => {
                tracing::debug!(reference, "Cleanup of a foreign reference ignored");
                return Ok(false);
            }
        };

        match self.temp.delete(temp_ref.file_name()).await {
            Ok(()) => {
                metrics::record_transition(ImageUploadState::Abandoned);
                tracing::info!(
                    file_name = %temp_ref,
                    state = ImageUploadState::Abandoned.as_str(),
                    "Deleted temp image"
                );
                Ok(true)
            }
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(file_name = %temp_ref, "Temp image already gone");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Permanent files not referenced by any room.
    pub async fn find_orphans(&self) -> Result<Vec<String>> {
        let referenced = self.referenced_names().await?;
        let orphans = self
            .permanent
            .list()
            .await?
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect();
        Ok(orphans)
    }

    /// Delete every permanent file not referenced by any room, after
    /// recovering stale claims in the temp area.
    ///
    /// Files named after a room are re-checked while holding that room
    /// exclusively, so a finalize in progress is never swept from under
    /// itself.
    pub async fn sweep_orphans(&self) -> Result<OrphanSweep> {
        let recovery = self.recover_claims().await?;

        let referenced = self.referenced_names().await?;
        let names = self.permanent.list().await?;
        let mut sweep = OrphanSweep {
            scanned: names.len(),
            claims_restored: recovery.restored,
            claims_deleted: recovery.deleted,
            ..OrphanSweep::default()
        };

        for name in names {
            if referenced.contains(&name) {
                continue;
            }

            let _guard = match PermanentImageRef::parse(&name) {
                Some(image) => {
                    let guard = self.locks.acquire(image.room_id()).await;
                    if self.is_current_image(image.room_id(), &name).await? {
                        continue;
                    }
                    Some(guard)
                }
                None => None,
            };

            match self.permanent.delete(&name).await {
                Ok(()) => sweep.deleted.push(name),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(image = %name, error = %e, "Failed to delete orphan");
                    sweep.failed.push(name);
                }
            }
        }

        metrics::ORPHANS_SWEPT.inc_by(sweep.deleted.len() as u64);
        tracing::info!(
            scanned = sweep.scanned,
            deleted = sweep.deleted.len(),
            failed = sweep.failed.len(),
            claims_restored = sweep.claims_restored.len(),
            claims_deleted = sweep.claims_deleted.len(),
            "Orphan sweep finished"
        );
        Ok(sweep)
    }

    /// Resolve claims in the temp area that no running finalize owns.
    ///
    /// Claims of finalizes that succeeded are deleted. Any other claim is
    /// renamed back to its temp name so the upload can be finalized or
    /// cleaned up again.
    pub async fn recover_claims(&self) -> Result<ClaimRecovery> {
        let mut recovery = ClaimRecovery::default();

        for key in self.temp.list_private(CLAIM_PREFIX).await? {
            let action = {
                let mut book = lock_book(&self.claims);
                if book.active.contains(&key) {
                    ClaimAction::Skip
                } else if book.finished.remove(&key) {
                    ClaimAction::Delete
                } else {
                    ClaimAction::Restore
                }
            };

            match action {
                ClaimAction::Skip => {}
                ClaimAction::Delete => match self.temp.delete(&key).await {
                    Ok(()) => recovery.deleted.push(key),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        tracing::warn!(claim = %key, error = %e, "Failed to delete finished claim");
                        lock_book(&self.claims).finished.insert(key);
                    }
                },
                ClaimAction::Restore => {
                    let Some(temp_ref) = claimed_upload(&key) else {
                        tracing::warn!(claim = %key, "Ignoring claim with a malformed name");
                        continue;
                    };
                    match self.temp.rename(&key, temp_ref.file_name()).await {
                        Ok(()) => {
                            tracing::info!(file_name = %temp_ref, "Restored stale claim");
                            recovery.restored.push(temp_ref.to_string());
                        }
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            tracing::warn!(claim = %key, error = %e, "Failed to restore stale claim")
                        }
                    }
                }
            }
        }

        Ok(recovery)
    }

    /// Content of the permanent image `image_url` points at, if it is stored.
    pub async fn room_image(&self, image_url: Option<&str>) -> Option<Bytes> {
        let name = permanent_file_name(image_url?, &self.config.permanent_url_prefix)?;
        match self.permanent.get(name).await {
            Ok(data) => Some(data),
            Err(e) if e.is_not_found() => {
                tracing::debug!(image = name, "Room image is not stored");
                None
            }
            Err(e) => {
                tracing::warn!(image = name, error = %e, "Failed to read room image");
                None
            }
        }
    }

    async fn referenced_names(&self) -> Result<HashSet<String>> {
        let urls = self.metadata.list_image_urls().await?;
        Ok(urls
            .iter()
            .filter_map(|url| permanent_file_name(url, &self.config.permanent_url_prefix))
            .map(str::to_string)
            .collect())
    }

    async fn is_current_image(&self, room_id: i64, name: &str) -> Result<bool> {
        let room = self.metadata.get_room(room_id).await?;
        Ok(room
            .and_then(|room| room.image_url)
            .is_some_and(|url| {
                permanent_file_name(&url, &self.config.permanent_url_prefix) == Some(name)
            }))
    }
}

fn claim_key(temp_ref: &TempImageRef) -> String {
    format!("{CLAIM_PREFIX}{}.{}", uuid::Uuid::new_v4().simple(), temp_ref)
}

/// The upload a claim key was made from.
fn claimed_upload(key: &str) -> Option<TempImageRef> {
    let (_, file_name) = key.strip_prefix(CLAIM_PREFIX)?.split_once('.')?;
    TempImageRef::parse(file_name).ok()
}

fn finalize_outcome(err: &Error) -> &'static str {
    match err {
        Error::RoomNotFound(_) => "room_not_found",
        Error::TempAssetMissing(_) => "temp_asset_missing",
        Error::StorageIo(_) => "storage_error",
        Error::InvalidMediaType(_) | Error::Validation(_) | Error::RenderFailed(_) => "error",
    }
}
