//! In-memory implementation of [`SceneRepository`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use scenehub_app::ports::SceneRepository;
use scenehub_domain::attribute::AttributeRef;
use scenehub_domain::error::{NotFoundError, SceneHubError};
use scenehub_domain::id::{DeviceId, SceneId};
use scenehub_domain::scene::Scene;

/// In-memory scene repository.
#[derive(Default)]
pub struct InMemorySceneRepository {
    scenes: RwLock<HashMap<SceneId, Scene>>,
}

impl InMemorySceneRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a scene, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the scene breaks an invariant.
    pub fn save(&self, scene: Scene) -> Result<Scene, SceneHubError> {
        scene.validate()?;
        self.write().insert(scene.id, scene.clone());
        Ok(scene)
    }

    /// Mark a scene as deleted. The record stays readable with
    /// `include_deleted`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the scene does not exist or is already
    /// deleted.
    pub fn soft_delete(&self, id: SceneId) -> Result<(), SceneHubError> {
        let mut scenes = self.write();
        match scenes.get_mut(&id) {
            Some(scene) if !scene.is_deleted() => {
                scene.deleted_at = Some(scenehub_domain::time::now());
                Ok(())
            }
            _ => Err(NotFoundError::scene(id).into()),
        }
    }

    /// All scenes, sorted by name.
    #[must_use]
    pub fn list(&self, include_deleted: bool) -> Vec<Scene> {
        let mut scenes: Vec<_> = self
            .read()
            .values()
            .filter(|s| include_deleted || !s.is_deleted())
            .cloned()
            .collect();
        scenes.sort_by(|a, b| a.name.cmp(&b.name));
        scenes
    }

    fn find_armed(&self, predicate: impl Fn(&Scene) -> bool) -> Vec<Scene> {
        self.read()
            .values()
            .filter(|s| s.auto_run && s.is_on && !s.is_deleted() && predicate(s))
            .cloned()
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SceneId, Scene>> {
        self.scenes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SceneId, Scene>> {
        self.scenes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SceneRepository for InMemorySceneRepository {
    fn get_by_id(
        &self,
        id: SceneId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Scene>, SceneHubError>> + Send {
        let r = self
            .read()
            .get(&id)
            .filter(|s| include_deleted || !s.is_deleted())
            .cloned();
        async { Ok(r) }
    }

    fn find_armed_for_weekday(
        &self,
        weekday: u8,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        let r = self.find_armed(|s| s.repeats_on(weekday));
        async { Ok(r) }
    }

    fn find_armed_by_device_attribute(
        &self,
        device_id: DeviceId,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        let r = self.find_armed(|s| s.watches(device_id, attribute));
        async { Ok(r) }
    }

    fn set_armed(
        &self,
        id: SceneId,
        is_on: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        let mut scenes = self.write();
        let r = match scenes.get_mut(&id) {
            Some(scene) if !scene.is_deleted() => {
                scene.is_on = is_on;
                Ok(())
            }
            _ => Err(NotFoundError::scene(id).into()),
        };
        drop(scenes);
        async { r }
    }
}
