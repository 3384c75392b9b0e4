//! CRUD - Lifecycle handler contract and the driver that runs it
//!
//! A resource implements [`ResourceCrud`]; the driver functions in this module
//! call it in a fixed protocol: create (or read an existing id), then poll the
//! read side until the reported lifecycle state lands in the target set.
//!
//! Handlers keep no "current resource" between calls. Every operation receives
//! the resource data explicitly and returns the remote object it produced.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::{Instant, sleep};

use crate::provider::{ProviderError, ProviderResult};
use crate::resource::{LifecycleState, ResourceData, ResourceId};

/// Default timeout for each operation (15 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default delay between two state polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-operation timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

/// Driver configuration
#[derive(Debug, Clone)]
pub struct CrudOptions {
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
    /// Sleep for the handler's settling time after create and delete
    pub extra_wait: bool,
}

impl Default for CrudOptions {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            extra_wait: true,
        }
    }
}

impl CrudOptions {
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_extra_wait(mut self, extra_wait: bool) -> Self {
        self.extra_wait = extra_wait;
        self
    }
}

/// How a resource left management
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The delete API was called
    Deleted,
    /// The resource cannot be deleted; its settings were restored instead
    Reverted,
}

/// Lifecycle handler of one resource type
#[async_trait]
pub trait ResourceCrud: Send + Sync {
    /// Locally persisted data (configuration plus computed attributes)
    type Data: ResourceData + Send + Sync;
    /// Object returned by the cloud API
    type Remote: Send + Sync;

    /// Resource type name, used in errors and logs
    fn resource_type(&self) -> &'static str;

    fn id<'a>(&self, remote: &'a Self::Remote) -> &'a str;

    fn state(&self, remote: &Self::Remote) -> LifecycleState;

    fn created_pending(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Provisioning]
    }

    fn created_target(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Available]
    }

    fn deleted_pending(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Terminating]
    }

    fn deleted_target(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Terminated]
    }

    /// Settling time after the target state was observed
    fn extra_wait_post_create_delete(&self) -> Option<Duration> {
        None
    }

    async fn create(&self, data: &mut Self::Data) -> ProviderResult<Self::Remote>;

    async fn get(&self, data: &Self::Data) -> ProviderResult<Self::Remote>;

    async fn update(&self, data: &Self::Data) -> ProviderResult<Self::Remote>;

    async fn delete(&self, data: &mut Self::Data) -> ProviderResult<RemovalOutcome>;

    /// Copy the remote object's attributes into the data
    fn set_data(&self, data: &mut Self::Data, remote: &Self::Remote);
}

/// Handler of a read-only data source
#[async_trait]
pub trait DataSourceCrud: Send + Sync {
    type Data: Send + Sync;
    type Remote: Send + Sync;

    async fn get(&self, data: &Self::Data) -> ProviderResult<Self::Remote>;

    fn set_data(&self, data: &mut Self::Data, remote: &Self::Remote);
}

fn resource_id<C: ResourceCrud>(crd: &C, data: &C::Data) -> ResourceId {
    let id = ResourceId::new(crd.resource_type());
    match data.id() {
        Some(identifier) => id.with_identifier(identifier),
        None => id,
    }
}

fn describe(states: &[LifecycleState]) -> String {
    states
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Poll `get` until the remote state is in `target`.
///
/// Returns `None` when the resource disappeared and `missing_is_target` is set.
#[allow(clippy::too_many_arguments)]
async fn wait_for_state<C: ResourceCrud>(
    crd: &C,
    data: &C::Data,
    mut remote: C::Remote,
    pending: &[LifecycleState],
    target: &[LifecycleState],
    timeout: Duration,
    options: &CrudOptions,
    missing_is_target: bool,
) -> ProviderResult<Option<C::Remote>> {
    // None when the timeout is too far out to represent
    let deadline = Instant::now().checked_add(timeout);

    loop {
        let state = crd.state(&remote);
        if target.contains(&state) {
            return Ok(Some(remote));
        }
        if !pending.contains(&state) {
            return Err(ProviderError::unexpected_state(format!(
                "Unexpected state {}, expected one of: {}",
                state,
                describe(target)
            ))
            .for_resource(resource_id(crd, data)));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ProviderError::timeout(format!(
                "Timed out after {:?} waiting for state {} (last state {})",
                timeout,
                describe(target),
                state
            ))
            .for_resource(resource_id(crd, data)));
        }

        debug!(
            "{} is {}, waiting for {}",
            resource_id(crd, data),
            state,
            describe(target)
        );
        sleep(options.poll_interval).await;

        remote = match crd.get(data).await {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() && missing_is_target => return Ok(None),
            Err(e) => return Err(e),
        };
    }
}

/// Create a resource and wait until it is usable
pub async fn create_resource<C: ResourceCrud>(
    crd: &C,
    data: &mut C::Data,
    options: &CrudOptions,
) -> ProviderResult<()> {
    let remote = crd.create(data).await?;
    data.set_id(crd.id(&remote).to_string());
    info!("Created {}", resource_id(crd, data));

    let remote = wait_for_state(
        crd,
        data,
        remote,
        crd.created_pending(),
        crd.created_target(),
        options.timeouts.create,
        options,
        false,
    )
    .await?
    .ok_or_else(|| {
        ProviderError::not_found("Resource disappeared while being created")
            .for_resource(resource_id(crd, data))
    })?;

    if options.extra_wait
        && let Some(extra) = crd.extra_wait_post_create_delete()
    {
        sleep(extra).await;
    }

    crd.set_data(data, &remote);
    Ok(())
}

/// Refresh a resource
///
/// Returns `false` when the resource is gone; its id has then been cleared.
pub async fn read_resource<C: ResourceCrud>(crd: &C, data: &mut C::Data) -> ProviderResult<bool> {
    let remote = match crd.get(data).await {
        Ok(remote) => remote,
        Err(e) if e.is_not_found() => {
            warn!("{} no longer exists: {}", resource_id(crd, data), e);
            data.clear_id();
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    crd.set_data(data, &remote);

    if crd.deleted_target().contains(&crd.state(&remote)) {
        debug!("{} is {}", resource_id(crd, data), crd.state(&remote));
        data.clear_id();
        return Ok(false);
    }

    Ok(true)
}

/// Push the configured settings onto an existing resource
pub async fn update_resource<C: ResourceCrud>(
    crd: &C,
    data: &mut C::Data,
    options: &CrudOptions,
) -> ProviderResult<()> {
    let remote = match tokio::time::timeout(options.timeouts.update, crd.update(data)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ProviderError::timeout(format!(
                "Timed out after {:?} updating",
                options.timeouts.update
            ))
            .for_resource(resource_id(crd, data)));
        }
    };

    crd.set_data(data, &remote);
    Ok(())
}

/// Remove a resource from management
pub async fn delete_resource<C: ResourceCrud>(
    crd: &C,
    data: &mut C::Data,
    options: &CrudOptions,
) -> ProviderResult<RemovalOutcome> {
    let outcome = crd.delete(data).await?;

    if outcome == RemovalOutcome::Deleted {
        match crd.get(data).await {
            Ok(remote) => {
                wait_for_state(
                    crd,
                    data,
                    remote,
                    crd.deleted_pending(),
                    crd.deleted_target(),
                    options.timeouts.delete,
                    options,
                    true,
                )
                .await?;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if options.extra_wait
            && let Some(extra) = crd.extra_wait_post_create_delete()
        {
            sleep(extra).await;
        }
    }

    info!("Removed {} ({:?})", resource_id(crd, data), outcome);
    data.clear_id();
    Ok(outcome)
}

/// Read a data source
pub async fn read_data_source<D: DataSourceCrud>(
    crd: &D,
    data: &mut D::Data,
) -> ProviderResult<()> {
    let remote = crd.get(data).await?;
    crd.set_data(data, &remote);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ErrorKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct MockData {
        id: Option<String>,
        state: Option<LifecycleState>,
    }

    impl ResourceData for MockData {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn clear_id(&mut self) {
            self.id = None;
        }

        fn merge_computed(&mut self, prior: &Self) {
            self.id = prior.id.clone();
        }
    }

    /// Reports the scripted states in order; the last one repeats.
    /// `None` stands for "not found".
    struct MockCrud {
        script: Mutex<Vec<Option<LifecycleState>>>,
        outcome: RemovalOutcome,
        extra: Option<Duration>,
        gets: AtomicUsize,
    }

    impl MockCrud {
        fn new(script: Vec<Option<LifecycleState>>) -> Self {
            Self {
                script: Mutex::new(script),
                outcome: RemovalOutcome::Deleted,
                extra: None,
                gets: AtomicUsize::new(0),
            }
        }

        fn next(&self) -> Option<LifecycleState> {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0]
            }
        }
    }

    #[async_trait]
    impl ResourceCrud for MockCrud {
        type Data = MockData;
        type Remote = (String, LifecycleState);

        fn resource_type(&self) -> &'static str {
            "mock"
        }

        fn id<'a>(&self, remote: &'a Self::Remote) -> &'a str {
            &remote.0
        }

        fn state(&self, remote: &Self::Remote) -> LifecycleState {
            remote.1
        }

        fn extra_wait_post_create_delete(&self) -> Option<Duration> {
            self.extra
        }

        async fn create(&self, _data: &mut MockData) -> ProviderResult<Self::Remote> {
            Ok(("mock-1".to_string(), LifecycleState::Provisioning))
        }

        async fn get(&self, _data: &MockData) -> ProviderResult<Self::Remote> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            match self.next() {
                Some(state) => Ok(("mock-1".to_string(), state)),
                None => Err(ProviderError::not_found("not found")),
            }
        }

        async fn update(&self, _data: &MockData) -> ProviderResult<Self::Remote> {
            Ok(("mock-1".to_string(), LifecycleState::Available))
        }

        async fn delete(&self, _data: &mut MockData) -> ProviderResult<RemovalOutcome> {
            Ok(self.outcome)
        }

        fn set_data(&self, data: &mut MockData, remote: &Self::Remote) {
            data.state = Some(remote.1);
        }
    }

    fn fast() -> CrudOptions {
        CrudOptions::default().with_poll_interval(Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn create_polls_until_target_state() {
        let crd = MockCrud::new(vec![
            Some(LifecycleState::Provisioning),
            Some(LifecycleState::Available),
        ]);
        let mut data = MockData::default();

        create_resource(&crd, &mut data, &fast()).await.unwrap();

        assert_eq!(data.id.as_deref(), Some("mock-1"));
        assert_eq!(data.state, Some(LifecycleState::Available));
        assert_eq!(crd.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn create_fails_on_unexpected_state() {
        let crd = MockCrud::new(vec![Some(LifecycleState::Terminated)]);
        let mut data = MockData::default();

        let err = create_resource(&crd, &mut data, &fast()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedState);
    }

    #[tokio::test(start_paused = true)]
    async fn create_times_out() {
        let crd = MockCrud::new(vec![Some(LifecycleState::Provisioning)]);
        let mut data = MockData::default();
        let options = fast().with_timeouts(Timeouts {
            create: Duration::from_secs(10),
            ..Timeouts::default()
        });

        let err = create_resource(&crd, &mut data, &options)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn read_clears_id_when_missing() {
        let crd = MockCrud::new(vec![None]);
        let mut data = MockData {
            id: Some("mock-1".to_string()),
            state: None,
        };

        assert!(!read_resource(&crd, &mut data).await.unwrap());
        assert!(data.id.is_none());
    }

    #[tokio::test]
    async fn read_clears_id_when_terminated() {
        let crd = MockCrud::new(vec![Some(LifecycleState::Terminated)]);
        let mut data = MockData {
            id: Some("mock-1".to_string()),
            state: None,
        };

        assert!(!read_resource(&crd, &mut data).await.unwrap());
        assert_eq!(data.state, Some(LifecycleState::Terminated));
        assert!(data.id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_waits_for_terminated() {
        let crd = MockCrud::new(vec![
            Some(LifecycleState::Terminating),
            Some(LifecycleState::Terminating),
            None,
        ]);
        let mut data = MockData {
            id: Some("mock-1".to_string()),
            state: None,
        };

        let outcome = delete_resource(&crd, &mut data, &fast()).await.unwrap();
        assert_eq!(outcome, RemovalOutcome::Deleted);
        assert_eq!(crd.gets.load(Ordering::SeqCst), 3);
        assert!(data.id.is_none());
    }

    #[tokio::test]
    async fn reverted_delete_does_not_poll() {
        let mut crd = MockCrud::new(vec![Some(LifecycleState::Available)]);
        crd.outcome = RemovalOutcome::Reverted;
        let mut data = MockData {
            id: Some("mock-1".to_string()),
            state: None,
        };

        let outcome = delete_resource(&crd, &mut data, &fast()).await.unwrap();
        assert_eq!(outcome, RemovalOutcome::Reverted);
        assert_eq!(crd.gets.load(Ordering::SeqCst), 0);
        assert!(data.id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn extra_wait_can_be_skipped() {
        let mut crd = MockCrud::new(vec![Some(LifecycleState::Available)]);
        crd.extra = Some(Duration::from_secs(15));

        let start = Instant::now();
        create_resource(&crd, &mut MockData::default(), &fast())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(15));

        let start = Instant::now();
        create_resource(&crd, &mut MockData::default(), &fast().with_extra_wait(false))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(15));
    }
}
