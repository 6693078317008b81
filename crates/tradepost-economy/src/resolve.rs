//! Item name resolution and purchase eligibility.

use tradepost_types::Item;

use crate::error::EconomyError;
use crate::service::EconomyService;

impl EconomyService {
    /// Turn user input into an internal item name.
    ///
    /// Public aliases are tried first through the name resolver. Otherwise
    /// the input is taken as an internal name and checked against the
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::ItemNotFound`] if neither matches, or
    /// [`EconomyError::Lookup`] if the catalog fails.
    pub async fn resolve_item_name(&self, input: &str) -> Result<String, EconomyError> {
        if let Some(internal) = self
            .names
            .as_ref()
            .and_then(|names| names.resolve_public_name(input))
        {
            return Ok(internal);
        }

        self.catalog
            .get_item_by_name(input)
            .await
            .map_err(|source| EconomyError::Lookup { source })?
            .map(|item| item.internal_name)
            .ok_or_else(|| EconomyError::ItemNotFound {
                name: input.to_owned(),
            })
    }

    /// Resolve `input` and fetch the catalog entry it names.
    pub(crate) async fn load_item(&self, input: &str) -> Result<Item, EconomyError> {
        let internal = self.resolve_item_name(input).await?;
        self.catalog
            .get_item_by_name(&internal)
            .await
            .map_err(|source| EconomyError::Lookup { source })?
            .ok_or_else(|| EconomyError::ItemNotFound { name: internal })
    }

    /// Check that `item` may be bought right now.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotBuyable`] if the catalog does not sell it,
    /// [`EconomyError::ItemLocked`] if the unlock gate reports it locked, and
    /// [`EconomyError::UnlockCheckFailed`] if the gate itself fails.
    pub async fn check_buy_eligibility(&self, item: &Item) -> Result<(), EconomyError> {
        let buyable = self
            .catalog
            .is_item_buyable(&item.internal_name)
            .await
            .map_err(|source| EconomyError::Lookup { source })?;
        if !buyable {
            return Err(EconomyError::NotBuyable {
                item: item.internal_name.clone(),
            });
        }

        if let Some(gate) = &self.unlocks {
            let unlocked = gate
                .is_item_unlocked(&item.internal_name)
                .await
                .map_err(|source| EconomyError::UnlockCheckFailed { source })?;
            if !unlocked {
                return Err(EconomyError::ItemLocked {
                    item: item.internal_name.clone(),
                });
            }
        }
        Ok(())
    }
}
