use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use reorder_posts::application::registry::{ExtensionPoints, ReorderRegistry};
use reorder_posts::application::reorder::{
    BatchDriver, BatchTransport, DriverStatus, ListEntry, ListSnapshot, MovedItem, PassState,
    RenumberBatchRequest, RenumberBatchResponse, ReorderEngine, ReorderError, ReorderIntent,
    ReorderService, RetryPolicy, TransportError,
};
use reorder_posts::application::settings::{
    ReorderSettingsService, TypeSettingsInput, UpdateReorderSettingsCommand,
};
use reorder_posts::domain::entities::{ItemId, ROOT_PARENT};
use reorder_posts::domain::types::{OrderBy, SortDirection};
use reorder_posts::infra::memory::InMemoryRepositories;
use tokio::sync::Mutex;

struct Fixture {
    repo: Arc<InMemoryRepositories>,
    service: Arc<ReorderService>,
    settings: Arc<ReorderSettingsService>,
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryRepositories::new());
    let registry =
        Arc::new(ReorderRegistry::with_defaults(ExtensionPoints::default()).expect("registry"));
    let settings = Arc::new(ReorderSettingsService::new(repo.clone(), registry.clone()));
    let engine = ReorderEngine::new(repo.clone(), repo.clone());
    let service = Arc::new(ReorderService::new(engine, registry, settings.clone()));
    Fixture {
        repo,
        service,
        settings,
    }
}

async fn seed(
    repo: &InMemoryRepositories,
    item_type: &str,
    parent: ItemId,
    count: usize,
) -> Vec<ItemId> {
    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        let ordinal = i32::try_from(index).expect("small fixture");
        ids.push(
            repo.insert(item_type, parent, ordinal, format!("{item_type} {index:04}"))
                .await,
        );
    }
    ids
}

async fn group_ids(repo: &InMemoryRepositories, item_type: &str, parent: ItemId) -> Vec<ItemId> {
    repo.group(item_type, parent)
        .await
        .into_iter()
        .map(|item| item.id)
        .collect()
}

async fn assert_contiguous(repo: &InMemoryRepositories, item_type: &str, parent: ItemId) {
    let ordinals: Vec<i32> = repo
        .group(item_type, parent)
        .await
        .into_iter()
        .map(|item| item.ordinal)
        .collect();
    let expected: Vec<i32> = (0..i32::try_from(ordinals.len()).expect("small group")).collect();
    assert_eq!(ordinals, expected, "ordinals of group {parent} are not contiguous");
}

/// Runs a whole pass against the service, returning the responses.
async fn run_pass(
    service: &ReorderService,
    first: RenumberBatchRequest,
) -> Result<Vec<RenumberBatchResponse>, ReorderError> {
    let mut request = first;
    let mut responses = Vec::new();
    let mut state = PassState::Started;
    loop {
        let outcome = service.run_batch(request.clone()).await?;
        state = state.advance(&outcome.response);
        let response = outcome.response;
        responses.push(response.clone());
        if state.is_done() {
            return Ok(responses);
        }
        request = request.continuation(&response);
    }
}

/// Calls the service in-process, recording every request.
struct ServiceTransport {
    service: Arc<ReorderService>,
    log: Mutex<Vec<RenumberBatchRequest>>,
}

impl ServiceTransport {
    fn new(service: Arc<ReorderService>) -> Self {
        Self {
            service,
            log: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BatchTransport for ServiceTransport {
    async fn send(
        &self,
        request: &RenumberBatchRequest,
    ) -> Result<RenumberBatchResponse, TransportError> {
        self.log.lock().await.push(request.clone());
        self.service
            .run_batch(request.clone())
            .await
            .map(|outcome| outcome.response)
            .map_err(|err| match err {
                ReorderError::Malformed(_) => TransportError::Rejected { status: 400 },
                _ => TransportError::Rejected { status: 500 },
            })
    }
}

/// Fails the first `failures` sends with a network error, then calls the
/// service.
struct FlakyTransport {
    inner: ServiceTransport,
    failures: u32,
    sends: AtomicU32,
}

impl FlakyTransport {
    fn new(service: Arc<ReorderService>, failures: u32) -> Self {
        Self {
            inner: ServiceTransport::new(service),
            failures,
            sends: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BatchTransport for FlakyTransport {
    async fn send(
        &self,
        request: &RenumberBatchRequest,
    ) -> Result<RenumberBatchResponse, TransportError> {
        let attempt = self.sends.fetch_add(1, AtomicOrdering::SeqCst);
        if attempt < self.failures {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        self.inner.send(request).await
    }
}

#[tokio::test]
async fn large_group_moves_to_front_in_three_round_trips() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 120).await;
    let moved = ids[74];

    let responses = run_pass(
        &fx.service,
        RenumberBatchRequest::start("post", ROOT_PARENT, Some(MovedItem { id: moved, ordinal: 0 })),
    )
    .await
    .expect("pass");

    assert_eq!(responses.len(), 3);
    assert!(responses[..2].iter().all(|response| response.has_more));
    assert!(!responses[2].has_more);

    let group = fx.repo.group("post", ROOT_PARENT).await;
    assert_eq!(group[0].id, moved);
    assert_eq!(group[0].ordinal, 0);

    let others: Vec<ItemId> = ids.iter().copied().filter(|id| *id != moved).collect();
    let rest: Vec<ItemId> = group[1..].iter().map(|item| item.id).collect();
    assert_eq!(rest, others);
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn pass_round_trips_follow_the_batch_size() {
    for (count, expected) in [(1usize, 1usize), (50, 1), (51, 2), (100, 2), (101, 3)] {
        let fx = fixture();
        seed(&fx.repo, "post", ROOT_PARENT, count).await;

        let responses = run_pass(
            &fx.service,
            RenumberBatchRequest::start("post", ROOT_PARENT, None),
        )
        .await
        .expect("pass");

        assert_eq!(responses.len(), expected, "round trips for {count} items");
        let last = responses.last().expect("at least one response");
        assert!(!last.has_more);
        assert_eq!(last.excluded.len(), count);
    }
}

#[tokio::test]
async fn moved_item_lands_between_its_new_neighbours() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 4).await;
    let (a, b, c, moved) = (ids[0], ids[1], ids[2], ids[3]);

    run_pass(
        &fx.service,
        RenumberBatchRequest::start("post", ROOT_PARENT, Some(MovedItem { id: moved, ordinal: 1 })),
    )
    .await
    .expect("pass");

    assert_eq!(group_ids(&fx.repo, "post", ROOT_PARENT).await, vec![a, moved, b, c]);
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn moving_to_the_end_keeps_ordinals_contiguous() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 5).await;

    run_pass(
        &fx.service,
        RenumberBatchRequest::start(
            "post",
            ROOT_PARENT,
            Some(MovedItem {
                id: ids[0],
                ordinal: 4,
            }),
        ),
    )
    .await
    .expect("pass");

    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[1], ids[2], ids[3], ids[4], ids[0]]
    );
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn out_of_range_target_is_pulled_back() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 3).await;

    run_pass(
        &fx.service,
        RenumberBatchRequest::start(
            "post",
            ROOT_PARENT,
            Some(MovedItem {
                id: ids[0],
                ordinal: 40,
            }),
        ),
    )
    .await
    .expect("pass");

    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[1], ids[2], ids[0]]
    );
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn repeating_a_completed_pass_changes_nothing() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 70).await;
    let first = RenumberBatchRequest::start(
        "post",
        ROOT_PARENT,
        Some(MovedItem {
            id: ids[60],
            ordinal: 3,
        }),
    );

    run_pass(&fx.service, first.clone()).await.expect("first pass");
    let after_first = fx.repo.group("post", ROOT_PARENT).await;
    let writes_after_first = fx.repo.write_count();

    run_pass(&fx.service, first).await.expect("second pass");
    let after_second = fx.repo.group("post", ROOT_PARENT).await;

    let ordinals =
        |items: &[reorder_posts::domain::entities::ItemRecord]| -> Vec<(ItemId, i32)> {
            items.iter().map(|item| (item.id, item.ordinal)).collect()
        };
    assert_eq!(ordinals(&after_first), ordinals(&after_second));
    // Only the moved item is rewritten; every sibling is already in place.
    assert_eq!(fx.repo.write_count(), writes_after_first + 1);
}

#[tokio::test]
async fn rows_deleted_mid_pass_are_skipped() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 6).await;
    fx.repo.vanish_on_write(ids[1]).await;

    let outcome = fx
        .service
        .run_batch(RenumberBatchRequest::start(
            "post",
            ROOT_PARENT,
            Some(MovedItem {
                id: ids[5],
                ordinal: 0,
            }),
        ))
        .await
        .expect("batch");

    assert_eq!(outcome.missing, 1);
    assert!(!outcome.response.has_more);
    assert!(fx.repo.get(ids[1]).await.is_none());
    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[5], ids[0], ids[2], ids[3], ids[4]]
    );
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn vanished_moved_item_releases_its_slot() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 5).await;
    fx.repo.vanish_on_write(ids[4]).await;

    let responses = run_pass(
        &fx.service,
        RenumberBatchRequest::start(
            "post",
            ROOT_PARENT,
            Some(MovedItem {
                id: ids[4],
                ordinal: 1,
            }),
        ),
    )
    .await
    .expect("pass");

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].moved, None);
    assert!(fx.repo.get(ids[4]).await.is_none());
    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[0], ids[1], ids[2], ids[3]]
    );
    assert_contiguous(&fx.repo, "post", ROOT_PARENT).await;
}

#[tokio::test]
async fn unknown_and_disabled_types_are_malformed() {
    let fx = fixture();
    seed(&fx.repo, "post", ROOT_PARENT, 2).await;

    let unknown = fx
        .service
        .run_batch(RenumberBatchRequest::start("product", ROOT_PARENT, None))
        .await;
    assert!(matches!(unknown, Err(ReorderError::Malformed(_))));

    fx.settings
        .update(
            "boss",
            UpdateReorderSettingsCommand {
                types: vec![TypeSettingsInput {
                    item_type: "post".to_string(),
                    enabled: false,
                    orderby: OrderBy::None,
                    order: SortDirection::Asc,
                }],
            },
        )
        .await
        .expect("settings update");

    let disabled = fx
        .service
        .run_batch(RenumberBatchRequest::start("post", ROOT_PARENT, None))
        .await;
    assert!(matches!(disabled, Err(ReorderError::Malformed(_))));
    assert_eq!(fx.repo.write_count(), 0);
}

#[tokio::test]
async fn flat_types_reject_nested_parents() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 2).await;

    let result = fx
        .service
        .run_batch(RenumberBatchRequest::start(
            "post",
            ids[0],
            Some(MovedItem {
                id: ids[1],
                ordinal: 0,
            }),
        ))
        .await;
    assert!(matches!(result, Err(ReorderError::Malformed(_))));
}

#[tokio::test]
async fn moves_into_own_subtree_or_across_types_are_malformed() {
    let fx = fixture();
    let roots = seed(&fx.repo, "page", ROOT_PARENT, 1).await;
    let children = seed(&fx.repo, "page", roots[0], 1).await;
    let grandchildren = seed(&fx.repo, "page", children[0], 1).await;
    let posts = seed(&fx.repo, "post", ROOT_PARENT, 1).await;

    for parent in [grandchildren[0], posts[0], 9_999] {
        let result = fx
            .service
            .run_batch(RenumberBatchRequest::start(
                "page",
                parent,
                Some(MovedItem {
                    id: roots[0],
                    ordinal: 0,
                }),
            ))
            .await;
        assert!(
            matches!(result, Err(ReorderError::Malformed(_))),
            "parent {parent} accepted"
        );
    }
    assert_eq!(fx.repo.write_count(), 0);
    assert_eq!(
        fx.repo.get(roots[0]).await.map(|item| item.parent_id),
        Some(ROOT_PARENT)
    );

    fx.service
        .run_batch(RenumberBatchRequest::start(
            "page",
            children[0],
            Some(MovedItem {
                id: posts[0],
                ordinal: 0,
            }),
        ))
        .await
        .expect_err("posts are not pages");
    assert_eq!(fx.repo.write_count(), 0);

    fx.service
        .run_batch(RenumberBatchRequest::start(
            "page",
            roots[0],
            Some(MovedItem {
                id: grandchildren[0],
                ordinal: 0,
            }),
        ))
        .await
        .expect("move up one level");
    assert_eq!(
        group_ids(&fx.repo, "page", roots[0]).await,
        vec![grandchildren[0], children[0]]
    );
}

#[tokio::test]
async fn reparenting_runs_destination_then_source_pass() {
    let fx = fixture();
    let roots = seed(&fx.repo, "page", ROOT_PARENT, 2).await;
    let parent = roots[0];
    let children = seed(&fx.repo, "page", parent, 3).await;
    let moved = children[1];

    // Dropped between the two root pages.
    let snapshot = ListSnapshot {
        siblings: vec![
            ListEntry {
                id: roots[0],
                parent_id: ROOT_PARENT,
            },
            ListEntry {
                id: moved,
                parent_id: parent,
            },
            ListEntry {
                id: roots[1],
                parent_id: ROOT_PARENT,
            },
        ],
        enclosing: None,
        base_offset: 0,
    };
    let intent = ReorderIntent::derive(moved, parent, &snapshot).expect("intent");
    assert_eq!(intent.end_parent, ROOT_PARENT);
    assert_eq!(intent.end_ordinal, 1);

    let transport = ServiceTransport::new(fx.service.clone());
    let driver = BatchDriver::new(transport, "page");
    let report = driver.apply(&intent).await.expect("drive");

    assert_eq!(report.destination_round_trips, 1);
    assert_eq!(report.source_round_trips, Some(1));
    assert_eq!(driver.status(), DriverStatus::Done);

    assert_eq!(
        group_ids(&fx.repo, "page", ROOT_PARENT).await,
        vec![roots[0], moved, roots[1]]
    );
    assert_eq!(
        group_ids(&fx.repo, "page", parent).await,
        vec![children[0], children[2]]
    );
    assert_contiguous(&fx.repo, "page", ROOT_PARENT).await;
    assert_contiguous(&fx.repo, "page", parent).await;
}

#[tokio::test]
async fn driver_sends_destination_pass_before_source_pass() {
    let fx = fixture();
    let roots = seed(&fx.repo, "page", ROOT_PARENT, 1).await;
    let children = seed(&fx.repo, "page", roots[0], 2).await;

    let intent = ReorderIntent {
        item_id: children[0],
        start_parent: roots[0],
        end_parent: ROOT_PARENT,
        end_ordinal: 0,
    };

    let driver = BatchDriver::new(ServiceTransport::new(fx.service.clone()), "page");
    driver.apply(&intent).await.expect("drive");

    let transport = ServiceTransport::new(fx.service.clone());
    let same_parent = BatchDriver::new(transport, "page");
    let report = same_parent
        .apply(&ReorderIntent {
            item_id: children[1],
            start_parent: roots[0],
            end_parent: roots[0],
            end_ordinal: 0,
        })
        .await
        .expect("drive");
    assert_eq!(report.source_round_trips, None);

    let driver_log = {
        let transport = ServiceTransport::new(fx.service.clone());
        let driver = BatchDriver::new(transport, "page");
        driver
            .apply(&ReorderIntent {
                item_id: children[1],
                start_parent: roots[0],
                end_parent: ROOT_PARENT,
                end_ordinal: 1,
            })
            .await
            .expect("drive");
        driver.into_transport().log.into_inner()
    };
    let parents: Vec<ItemId> = driver_log.iter().map(|request| request.parent_id).collect();
    assert_eq!(parents, vec![ROOT_PARENT, roots[0]]);
    assert!(driver_log[0].moved.is_some());
    assert!(driver_log[1].moved.is_none());
}

#[tokio::test]
async fn rejected_batches_surface_as_failed_status() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 2).await;

    let driver = BatchDriver::new(ServiceTransport::new(fx.service.clone()), "product")
        .with_retry(RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        });
    let intent = ReorderIntent {
        item_id: ids[1],
        start_parent: ROOT_PARENT,
        end_parent: ROOT_PARENT,
        end_ordinal: 0,
    };

    let err = driver.apply(&intent).await.expect_err("unknown type");
    assert_eq!(err, TransportError::Rejected { status: 400 });
    assert!(matches!(driver.status(), DriverStatus::Failed(_)));
    // Rejections are not retried.
    assert_eq!(driver.into_transport().log.into_inner().len(), 1);
}

#[tokio::test]
async fn network_failures_are_retried_until_the_batch_lands() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 3).await;

    let driver = BatchDriver::new(FlakyTransport::new(fx.service.clone(), 2), "post")
        .with_retry(RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        });
    let report = driver
        .apply(&ReorderIntent {
            item_id: ids[2],
            start_parent: ROOT_PARENT,
            end_parent: ROOT_PARENT,
            end_ordinal: 0,
        })
        .await
        .expect("drive");

    assert_eq!(report.destination_round_trips, 1);
    assert_eq!(driver.status(), DriverStatus::Done);
    let transport = driver.into_transport();
    assert_eq!(transport.sends.load(AtomicOrdering::SeqCst), 3);
    assert_eq!(transport.inner.log.into_inner().len(), 1);
    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[2], ids[0], ids[1]]
    );
}

#[tokio::test]
async fn exhausted_retries_end_in_failed_status() {
    let fx = fixture();
    let ids = seed(&fx.repo, "post", ROOT_PARENT, 3).await;

    let driver = BatchDriver::new(FlakyTransport::new(fx.service.clone(), 5), "post")
        .with_retry(RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        });
    let err = driver
        .apply(&ReorderIntent {
            item_id: ids[2],
            start_parent: ROOT_PARENT,
            end_parent: ROOT_PARENT,
            end_ordinal: 0,
        })
        .await
        .expect_err("network stays down");

    assert!(matches!(err, TransportError::Network(_)));
    assert!(matches!(driver.status(), DriverStatus::Failed(_)));
    let transport = driver.into_transport();
    assert_eq!(transport.sends.load(AtomicOrdering::SeqCst), 3);
    assert!(transport.inner.log.into_inner().is_empty());
    assert_eq!(
        group_ids(&fx.repo, "post", ROOT_PARENT).await,
        vec![ids[0], ids[1], ids[2]]
    );
}
