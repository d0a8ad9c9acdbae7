//! Watchlist state.

use crate::models::FavoriteCoin;

#[derive(Debug, Default)]
pub struct WatchlistState {
    pub favorites: Vec<FavoriteCoin>,
    pub selected_index: Option<usize>,
    pub loading: bool,
}

impl WatchlistState {
    pub fn selected(&self) -> Option<&FavoriteCoin> {
        self.selected_index.and_then(|i| self.favorites.get(i))
    }

    pub fn contains(&self, coin_id: &str) -> bool {
        self.favorites.iter().any(|f| f.coin_id == coin_id)
    }
}
