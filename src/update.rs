// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use crate::error::UpdateError;
use crate::feed::Item;
use crate::http::HttpClient;
use crate::item::materialize_items;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::snapshot;
use crate::state::plan_new_items;
use crate::subscription::{Subscription, SubscriptionStore};

/// Outcome of checking one subscription for new items
#[derive(Debug)]
pub struct SubscriptionCheck {
    pub subscription: Subscription,
    pub result: Result<Vec<Item>, UpdateError>,
}

/// Register a new subscription.
///
/// The name is validated first, then the feed is fetched into a fresh
/// snapshot, and only then is the subscription persisted. Any failure
/// leaves the store unchanged.
pub async fn add_subscription<C: HttpClient + ?Sized>(
    store: &mut SubscriptionStore,
    client: &C,
    name: &str,
    feed_url: &str,
    storage_dir: impl Into<PathBuf>,
    reporter: &SharedProgressReporter,
) -> Result<Subscription, UpdateError> {
    store.check_available(name)?;

    let subscription = Subscription::new(name, feed_url, storage_dir);
    snapshot::refresh(client, &subscription, reporter).await?;
    store.add(subscription.clone())?;

    tracing::debug!(
        "Added subscription '{}' stored in {}",
        subscription.name,
        subscription.local_store.display()
    );

    Ok(subscription)
}

/// Refresh a subscription's snapshot and list the items not yet stored locally
pub async fn check_subscription<C: HttpClient + ?Sized>(
    client: &C,
    subscription: &Subscription,
    reporter: &SharedProgressReporter,
) -> Result<Vec<Item>, UpdateError> {
    snapshot::refresh(client, subscription, reporter).await?;

    let plan = plan_new_items(subscription)?;

    reporter.report(ProgressEvent::NewItemsFound {
        subscription: subscription.name.clone(),
        total_items: plan.total_items,
        new_items: plan.new_items.len(),
    });

    Ok(plan.new_items)
}

/// Check several subscriptions at once, one task per subscription.
///
/// A failing subscription never affects the others. Outcomes are returned
/// in the order the subscriptions were given.
pub async fn check_subscriptions<C: HttpClient + Clone + 'static>(
    client: &C,
    subscriptions: Vec<Subscription>,
    reporter: SharedProgressReporter,
) -> Vec<SubscriptionCheck> {
    let mut handles = Vec::with_capacity(subscriptions.len());

    for subscription in subscriptions {
        let client = client.clone();
        let reporter = reporter.clone();
        let task_subscription = subscription.clone();

        let handle = tokio::spawn(async move {
            check_subscription(&client, &task_subscription, &reporter).await
        });

        handles.push((subscription, handle));
    }

    let mut checks = Vec::with_capacity(handles.len());
    for (subscription, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(UpdateError::TaskFailed {
                name: subscription.name.clone(),
                reason: e.to_string(),
            }),
        };

        if let Err(e) = &result {
            tracing::warn!("Checking '{}' failed: {e}", subscription.name);
        }

        checks.push(SubscriptionCheck {
            subscription,
            result,
        });
    }

    checks
}

/// Download the approved items of a subscription, one at a time
pub async fn materialize<C: HttpClient + ?Sized>(
    client: &C,
    subscription: &Subscription,
    items: Vec<Item>,
    reporter: &SharedProgressReporter,
) -> Result<Vec<Item>, UpdateError> {
    Ok(materialize_items(client, subscription, items, reporter).await?)
}
