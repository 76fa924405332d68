//! The matching engine: resolves fresh market and limit orders against the
//! opposing side of the book under price-time priority.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::trace;

use super::book::{BookEntry, OrderBook};
use crate::order::{Order, OrderStatus, Side};
use crate::utils::notional;

/// Stateless resolver for incoming orders.
///
/// The four entry points are the only legal way to run matching; no caller
/// mutates the priority structures directly after construction. All four
/// share the same skeleton: peek the best opposing entry, skip own resting
/// orders (re-inserted afterwards with their original keys), pop once a
/// fill is certain, resolve it at the resting price, and publish the price
/// update. Every monetary amount is rounded half-to-even before touching a
/// ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchMaker;

impl MatchMaker {
    /// Create a matchmaker. Stateless; a single value can serve any number
    /// of books.
    pub fn new() -> Self {
        MatchMaker
    }

    /// Resolve a market BID against the ask side.
    ///
    /// Walks asks best-first while the order has volume, crossing whole
    /// resting lots when affordable and partially filling the front ask
    /// otherwise. Progression stops when the buyer cannot afford a single
    /// share of the best ask. Market orders never rest: any residual
    /// terminates CANCELED.
    pub fn match_market_bid(&self, book: &OrderBook, order: &mut Order) {
        let taker_id = order.agent_id.clone();
        let mut skipped: Vec<BookEntry> = Vec::new();

        while order.volume > 0 {
            let Some(best) = book.peek_entry(Side::Ask) else {
                break;
            };
            if self.skip_if_own(book, Side::Ask, &best, &taker_id, &mut skipped) {
                continue;
            }

            let cash = book
                .with_agent(&taker_id, |a| a.cash())
                .unwrap_or(Decimal::ZERO);
            let affordable = order.volume.min(affordable_volume(cash, best.price));
            if affordable == 0 {
                trace!(order_id = %order.id, ask = %best.price, "buyer cannot afford best ask");
                break;
            }

            let Some((_, mut resting)) = self.pop_resting(book, Side::Ask) else {
                continue;
            };

            if resting.volume <= affordable {
                // Cross the whole resting lot.
                let volume = resting.volume;
                let amount = notional(resting.price, volume, book.round_ndigits());
                book.with_agent_mut(&resting.agent_id, |a| {
                    a.update_cash(amount);
                    a.remove_active_ask(&resting.id);
                });
                book.with_agent_mut(&taker_id, |a| {
                    a.update_holdings(resting.price, volume);
                    a.update_cash(-amount);
                });
                order.volume -= volume;
                book.fill_order(&mut resting);
                book.publish_trade(&resting.id, &order.id, resting.price, volume);
            } else {
                // Take what the buyer can afford; the ask keeps resting.
                let volume = affordable;
                let amount = notional(resting.price, volume, book.round_ndigits());
                book.with_agent_mut(&resting.agent_id, |a| {
                    a.update_cash(amount);
                    a.upsert_active_ask(&resting.id);
                });
                book.with_agent_mut(&taker_id, |a| {
                    a.update_holdings(resting.price, volume);
                    a.update_cash(-amount);
                });
                book.partial_fill_order(&mut resting, volume);
                book.publish_trade(&resting.id, &order.id, resting.price, volume);
                order.volume = 0;
            }
        }

        self.restore_skipped(book, Side::Ask, skipped);
        order.status = if order.volume == 0 {
            OrderStatus::Closed
        } else {
            OrderStatus::Canceled
        };
        book.record_order(order);
    }

    /// Resolve a limit BID against the ask side.
    ///
    /// Same walk as the market variant, additionally bounded by the limit:
    /// only asks priced at or below the bid are crossed. The buyer's cash
    /// was reserved once at creation, so fills transfer the reservation
    /// into holdings without debiting again. A residual rests in the bid
    /// book and stays OPEN.
    pub fn match_limit_bid(&self, book: &OrderBook, order: &mut Order) {
        let taker_id = order.agent_id.clone();
        let mut skipped: Vec<BookEntry> = Vec::new();

        while order.volume > 0 {
            let Some(best) = book.peek_entry(Side::Ask) else {
                break;
            };
            if best.price > order.price {
                break;
            }
            if self.skip_if_own(book, Side::Ask, &best, &taker_id, &mut skipped) {
                continue;
            }

            let Some((_, mut resting)) = self.pop_resting(book, Side::Ask) else {
                continue;
            };

            if resting.volume <= order.volume {
                let volume = resting.volume;
                let amount = notional(resting.price, volume, book.round_ndigits());
                book.with_agent_mut(&resting.agent_id, |a| {
                    a.update_cash(amount);
                    a.remove_active_ask(&resting.id);
                });
                book.with_agent_mut(&taker_id, |a| {
                    a.update_holdings(resting.price, volume);
                });
                order.volume -= volume;
                book.fill_order(&mut resting);
                book.publish_trade(&resting.id, &order.id, resting.price, volume);
            } else {
                let volume = order.volume;
                let amount = notional(resting.price, volume, book.round_ndigits());
                book.with_agent_mut(&resting.agent_id, |a| {
                    a.update_cash(amount);
                    a.upsert_active_ask(&resting.id);
                });
                book.with_agent_mut(&taker_id, |a| {
                    a.update_holdings(resting.price, volume);
                });
                book.partial_fill_order(&mut resting, volume);
                book.publish_trade(&resting.id, &order.id, resting.price, volume);
                order.volume = 0;
            }
        }

        self.restore_skipped(book, Side::Ask, skipped);
        if order.volume > 0 {
            book.add_order(order);
            book.with_agent_mut(&taker_id, |a| a.upsert_active_bid(&order.id));
        } else {
            order.status = OrderStatus::Closed;
            book.record_order(order);
        }
    }

    /// Resolve a market ASK against the bid side.
    ///
    /// The seller's shares were withdrawn into `reserved_shares` at
    /// creation. Fills credit the seller at each resting bid's price and
    /// hand the buyer shares at that price. A residual terminates CANCELED
    /// and the unsold lots are restored cheapest-first.
    pub fn match_market_ask(&self, book: &OrderBook, order: &mut Order) {
        let taker_id = order.agent_id.clone();
        let mut skipped: Vec<BookEntry> = Vec::new();

        while order.volume > 0 {
            let Some(best) = book.peek_entry(Side::Bid) else {
                break;
            };
            if self.skip_if_own(book, Side::Bid, &best, &taker_id, &mut skipped) {
                continue;
            }

            let Some((_, mut resting)) = self.pop_resting(book, Side::Bid) else {
                continue;
            };

            self.fill_against_bid(book, order, &mut resting, &taker_id);
        }

        self.restore_skipped(book, Side::Bid, skipped);
        if order.volume > 0 {
            order.status = OrderStatus::Canceled;
            let lots = order.returnable_shares();
            book.with_agent_mut(&taker_id, |a| {
                for &(lot_price, lot_volume) in &lots {
                    a.update_holdings(lot_price, lot_volume);
                }
            });
        } else {
            order.status = OrderStatus::Closed;
        }
        book.record_order(order);
    }

    /// Resolve a limit ASK against the bid side.
    ///
    /// Only bids priced at or above the ask are crossed. A residual rests
    /// in the ask book, keeps its reserved lots, and stays OPEN.
    pub fn match_limit_ask(&self, book: &OrderBook, order: &mut Order) {
        let taker_id = order.agent_id.clone();
        let mut skipped: Vec<BookEntry> = Vec::new();

        while order.volume > 0 {
            let Some(best) = book.peek_entry(Side::Bid) else {
                break;
            };
            if best.price < order.price {
                break;
            }
            if self.skip_if_own(book, Side::Bid, &best, &taker_id, &mut skipped) {
                continue;
            }

            let Some((_, mut resting)) = self.pop_resting(book, Side::Bid) else {
                continue;
            };

            self.fill_against_bid(book, order, &mut resting, &taker_id);
        }

        self.restore_skipped(book, Side::Bid, skipped);
        if order.volume > 0 {
            book.add_order(order);
            book.with_agent_mut(&taker_id, |a| a.upsert_active_ask(&order.id));
        } else {
            order.status = OrderStatus::Closed;
            book.record_order(order);
        }
    }

    /// One fill of an incoming ask against a resting bid: seller is paid
    /// at the bid's price, the bidder receives shares at that price (their
    /// cash was reserved when the bid was created).
    fn fill_against_bid(
        &self,
        book: &OrderBook,
        order: &mut Order,
        resting: &mut Order,
        taker_id: &str,
    ) {
        if resting.volume <= order.volume {
            let volume = resting.volume;
            let amount = notional(resting.price, volume, book.round_ndigits());
            book.with_agent_mut(taker_id, |a| a.update_cash(amount));
            book.with_agent_mut(&resting.agent_id, |a| {
                a.update_holdings(resting.price, volume);
                a.remove_active_bid(&resting.id);
            });
            order.volume -= volume;
            book.fill_order(resting);
            book.publish_trade(&resting.id, &order.id, resting.price, volume);
        } else {
            let volume = order.volume;
            let amount = notional(resting.price, volume, book.round_ndigits());
            book.with_agent_mut(taker_id, |a| a.update_cash(amount));
            book.with_agent_mut(&resting.agent_id, |a| {
                a.update_holdings(resting.price, volume);
                a.upsert_active_bid(&resting.id);
            });
            book.partial_fill_order(resting, volume);
            book.publish_trade(&resting.id, &order.id, resting.price, volume);
            order.volume = 0;
        }
    }

    /// If the best opposing entry belongs to the acting agent, pop it into
    /// the stash and report `true`; the caller continues with the next
    /// entry. Stashed entries are re-inserted after the loop, so their
    /// queue position is preserved.
    fn skip_if_own(
        &self,
        book: &OrderBook,
        side: Side,
        best: &BookEntry,
        taker_id: &str,
        skipped: &mut Vec<BookEntry>,
    ) -> bool {
        match book.order_agent(&best.id) {
            Some(owner) if owner == taker_id => {
                if let Some(own) = book.get_best(side) {
                    trace!(order_id = %own.id, "skipping own resting order");
                    skipped.push(own);
                }
                true
            }
            Some(_) => false,
            None => {
                // Queue entry with no backing order: drop it and move on.
                book.get_best(side);
                true
            }
        }
    }

    /// Pop the best entry and load its backing order. A missing backing
    /// order drops the stale entry.
    fn pop_resting(&self, book: &OrderBook, side: Side) -> Option<(BookEntry, Order)> {
        let entry = book.get_best(side)?;
        let order = book.order(&entry.id)?;
        Some((entry, order))
    }

    fn restore_skipped(&self, book: &OrderBook, side: Side, skipped: Vec<BookEntry>) {
        for entry in skipped {
            book.requeue_entry(side, entry);
        }
    }
}

/// How many shares `cash` buys at `price`, rounded down.
fn affordable_volume(cash: Decimal, price: Decimal) -> u64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    (cash / price).floor().to_u64().unwrap_or(0)
}
