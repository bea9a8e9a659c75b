//! Yearly weapon-order fulfilment.

use chrono::Datelike;
use tracing::{info, warn};
use worldsim_types::{ChangeSummary, CountryState, DeliveryRecord, MilitaryUnit, UnitId};

use crate::clock::TickContext;
use crate::processors::{DomainProcessor, ProcessorError};

/// Turns due procurement orders into stationed units.
///
/// An order is due when its delivery year is not after the current year.
/// Orders whose base no longer exists stay pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryProcessor;

impl DomainProcessor for DeliveryProcessor {
    fn name(&self) -> &'static str {
        "deliveries"
    }

    fn process(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        let year = ctx.date.year();
        let mut summary = ChangeSummary::default();
        let mut delivered = Vec::new();
        let mut pending = Vec::new();

        for order in std::mem::take(&mut state.pending_deliveries) {
            if order.delivery_year > year {
                pending.push(order);
                continue;
            }
            let Some(base) = state.forces.base(&order.base_id).cloned() else {
                warn!(
                    country = %state.code(),
                    order_id = %order.order_id,
                    base_id = %order.base_id,
                    "Delivery base not found; order kept pending"
                );
                pending.push(order);
                continue;
            };

            let unit_id = UnitId::from(format!("unit_{}", order.order_id));
            let mut unit = MilitaryUnit::new(
                unit_id.clone(),
                format!("{} ({})", order.unit_type, order.order_id),
                order.unit_type.clone(),
                order.category,
                base.location,
            )
            .stationed_at(&base);
            unit.quantity = order.quantity;
            state.forces.units.push(unit);

            summary.record(format!("deliveries.{}", order.unit_type), f64::from(order.quantity));
            info!(
                country = %state.code(),
                order_id = %order.order_id,
                unit_id = %unit_id,
                quantity = order.quantity,
                "Order delivered"
            );
            delivered.push(DeliveryRecord {
                order_id: order.order_id,
                unit_id,
                delivered_on: ctx.date,
            });
        }

        state.pending_deliveries = pending;
        state.recent_deliveries = delivered;
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use worldsim_types::{
        BaseId, BaseType, Coordinates, CountryCode, MilitaryBase, PendingDelivery, TickKind,
        UnitCategory, UnitStatus,
    };

    use super::*;

    fn order(id: &str, year: i32, base: &str) -> PendingDelivery {
        PendingDelivery {
            order_id: id.to_owned(),
            unit_type: String::from("K2"),
            category: UnitCategory::Ground,
            quantity: 12,
            delivery_year: year,
            base_id: BaseId::from(base),
        }
    }

    fn ctx(year: i32) -> TickContext {
        TickContext {
            kind: TickKind::Yearly,
            date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            day_count: 0,
        }
    }

    fn state() -> CountryState {
        let mut s = CountryState::new(CountryCode::from("KOR"), "Korea");
        s.forces.bases.push(MilitaryBase::new(
            "camp_north",
            "Camp North",
            Coordinates::new(37.9, 127.0).unwrap(),
            BaseType::ArmyBase,
        ));
        s
    }

    #[test]
    fn due_orders_become_units() {
        let mut s = state();
        s.pending_deliveries = vec![
            order("po_1", 2025, "camp_north"),
            order("po_2", 2026, "camp_north"),
        ];

        let summary = DeliveryProcessor.process(&mut s, &ctx(2025)).unwrap();
        assert_eq!(s.pending_deliveries.len(), 1);
        assert_eq!(s.recent_deliveries.len(), 1);
        let unit = s.forces.unit(&UnitId::from("unit_po_1")).unwrap();
        assert_eq!(unit.status, UnitStatus::Idle);
        assert_eq!(unit.quantity, 12);
        assert_eq!(unit.current_base_id, Some(BaseId::from("camp_north")));
        assert!((summary.changes["deliveries.K2"] - 12.0).abs() < 1e-9);
    }

    #[test]
    fn recent_deliveries_replaced_each_year() {
        let mut s = state();
        s.pending_deliveries = vec![order("po_1", 2025, "camp_north")];
        DeliveryProcessor.process(&mut s, &ctx(2025)).unwrap();
        DeliveryProcessor.process(&mut s, &ctx(2026)).unwrap();
        assert!(s.recent_deliveries.is_empty());
        assert_eq!(s.forces.units.len(), 1);
    }

    #[test]
    fn missing_base_keeps_order_pending() {
        let mut s = state();
        s.pending_deliveries = vec![order("po_9", 2020, "nowhere")];
        DeliveryProcessor.process(&mut s, &ctx(2025)).unwrap();
        assert_eq!(s.pending_deliveries.len(), 1);
        assert!(s.forces.units.is_empty());
    }
}
