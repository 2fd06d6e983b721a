//! Comfort setpoint bands for automatic environment control.
//!
//! An environment under automatic control carries two independent bands:
//!
//! - **cooling**: starts when the room reaches the cool *trigger* and runs
//!   until it is brought down to the cool *target* (target < trigger);
//! - **heating**: starts when the room drops to the heat *trigger* and runs
//!   until it is brought up to the heat *target* (target > trigger).
//!
//! When both bands are enabled they must not overlap: the heating target
//! never exceeds the cooling target, and the heating trigger stays strictly
//! below the cooling target. Every mutation goes through [`ComfortBands`],
//! which either applies the change in full or rejects it with a
//! [`SetpointRejection`] and leaves the bands untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Lowest setpoint accepted for any band, in whole degrees.
pub const MIN_TEMP: i32 = -30;
/// Highest setpoint accepted for any band, in whole degrees.
pub const MAX_TEMP: i32 = 50;

pub const DEFAULT_COOL_TRIGGER: i32 = 26;
pub const DEFAULT_COOL_TARGET: i32 = 24;
pub const DEFAULT_HEAT_TRIGGER: i32 = 18;
pub const DEFAULT_HEAT_TARGET: i32 = 20;

/// One of the four adjustable setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SetpointField {
    CoolTrigger,
    CoolTarget,
    HeatTrigger,
    HeatTarget,
}

impl fmt::Display for SetpointField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetpointField::CoolTrigger => "cool trigger",
            SetpointField::CoolTarget => "cool target",
            SetpointField::HeatTrigger => "heat trigger",
            SetpointField::HeatTarget => "heat target",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Band {
    Cooling,
    Heating,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Cooling => f.write_str("cooling"),
            Band::Heating => f.write_str("heating"),
        }
    }
}

/// Why a setpoint change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetpointRejection {
    #[error("{field} must be between -30 and 50 degrees, got {value}")]
    OutOfRange { field: SetpointField, value: i32 },
    #[error("cool target ({target}) must stay below the cool trigger ({trigger})")]
    CoolTargetNotBelowTrigger { target: i32, trigger: i32 },
    #[error("heat target ({target}) must stay above the heat trigger ({trigger})")]
    HeatTargetNotAboveTrigger { target: i32, trigger: i32 },
    #[error("heat target ({heat_target}) must not exceed the cool target ({cool_target})")]
    BandsOverlap { heat_target: i32, cool_target: i32 },
    #[error("heat trigger ({heat_trigger}) must stay below the cool target ({cool_target})")]
    HeatTriggerNotBelowCoolTarget { heat_trigger: i32, cool_target: i32 },
    #[error("cool trigger ({cool_trigger}) must exceed the heat target ({heat_target})")]
    CoolTriggerNotAboveHeatTarget { cool_trigger: i32, heat_target: i32 },
    #[error("cannot enable {0} without moving a setpoint outside -30..50")]
    NoRoomForBand(Band),
}

/// A single control change, as sent by a slider or toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "change", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum SetpointChange {
    CoolingEnabled(bool),
    HeatingEnabled(bool),
    CoolTrigger(i32),
    CoolTarget(i32),
    HeatTrigger(i32),
    HeatTarget(i32),
}

/// What the equipment of an environment should currently be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HvacDemand {
    #[default]
    Idle,
    Cooling,
    Heating,
}

impl std::str::FromStr for HvacDemand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(HvacDemand::Idle),
            "cooling" => Ok(HvacDemand::Cooling),
            "heating" => Ok(HvacDemand::Heating),
            _ => Err(format!("Invalid demand: {}", s)),
        }
    }
}

/// Cooling and heating setpoints of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComfortBands {
    pub cooling_enabled: bool,
    pub heating_enabled: bool,
    pub cool_trigger_temp: i32,
    pub cool_target_temp: i32,
    pub heat_trigger_temp: i32,
    pub heat_target_temp: i32,
}

impl Default for ComfortBands {
    fn default() -> Self {
        Self {
            cooling_enabled: false,
            heating_enabled: false,
            cool_trigger_temp: DEFAULT_COOL_TRIGGER,
            cool_target_temp: DEFAULT_COOL_TARGET,
            heat_trigger_temp: DEFAULT_HEAT_TRIGGER,
            heat_target_temp: DEFAULT_HEAT_TARGET,
        }
    }
}

fn check_range(field: SetpointField, value: i32) -> Result<(), SetpointRejection> {
    if (MIN_TEMP..=MAX_TEMP).contains(&value) {
        Ok(())
    } else {
        Err(SetpointRejection::OutOfRange { field, value })
    }
}

impl ComfortBands {
    /// Returns true when at least one band is enabled. With both disabled the
    /// environment is under manual control only.
    pub fn is_automatic(&self) -> bool {
        self.cooling_enabled || self.heating_enabled
    }

    fn both_enabled(&self) -> bool {
        self.cooling_enabled && self.heating_enabled
    }

    /// Checks every invariant at once. Used for whole-object replacement and
    /// as a final guard after individual changes.
    pub fn validate(&self) -> Result<(), SetpointRejection> {
        check_range(SetpointField::CoolTrigger, self.cool_trigger_temp)?;
        check_range(SetpointField::CoolTarget, self.cool_target_temp)?;
        check_range(SetpointField::HeatTrigger, self.heat_trigger_temp)?;
        check_range(SetpointField::HeatTarget, self.heat_target_temp)?;

        if self.cool_target_temp >= self.cool_trigger_temp {
            return Err(SetpointRejection::CoolTargetNotBelowTrigger {
                target: self.cool_target_temp,
                trigger: self.cool_trigger_temp,
            });
        }
        if self.heat_target_temp <= self.heat_trigger_temp {
            return Err(SetpointRejection::HeatTargetNotAboveTrigger {
                target: self.heat_target_temp,
                trigger: self.heat_trigger_temp,
            });
        }

        if self.both_enabled() {
            if self.heat_target_temp > self.cool_target_temp {
                return Err(SetpointRejection::BandsOverlap {
                    heat_target: self.heat_target_temp,
                    cool_target: self.cool_target_temp,
                });
            }
            if self.heat_trigger_temp >= self.cool_target_temp {
                return Err(SetpointRejection::HeatTriggerNotBelowCoolTarget {
                    heat_trigger: self.heat_trigger_temp,
                    cool_target: self.cool_target_temp,
                });
            }
        }
        Ok(())
    }

    /// Commits `next` only if it passes full validation.
    fn commit(&mut self, next: ComfortBands) -> Result<(), SetpointRejection> {
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn set_cool_trigger(&mut self, value: i32) -> Result<(), SetpointRejection> {
        check_range(SetpointField::CoolTrigger, value)?;
        if self.heating_enabled && value <= self.heat_target_temp {
            return Err(SetpointRejection::CoolTriggerNotAboveHeatTarget {
                cool_trigger: value,
                heat_target: self.heat_target_temp,
            });
        }
        if value <= self.cool_target_temp {
            return Err(SetpointRejection::CoolTargetNotBelowTrigger {
                target: self.cool_target_temp,
                trigger: value,
            });
        }
        self.commit(ComfortBands { cool_trigger_temp: value, ..*self })
    }

    pub fn set_cool_target(&mut self, value: i32) -> Result<(), SetpointRejection> {
        check_range(SetpointField::CoolTarget, value)?;
        if value >= self.cool_trigger_temp {
            return Err(SetpointRejection::CoolTargetNotBelowTrigger {
                target: value,
                trigger: self.cool_trigger_temp,
            });
        }
        if self.heating_enabled && value < self.heat_target_temp {
            return Err(SetpointRejection::BandsOverlap {
                heat_target: self.heat_target_temp,
                cool_target: value,
            });
        }
        self.commit(ComfortBands { cool_target_temp: value, ..*self })
    }

    pub fn set_heat_trigger(&mut self, value: i32) -> Result<(), SetpointRejection> {
        check_range(SetpointField::HeatTrigger, value)?;
        if self.cooling_enabled && value >= self.cool_target_temp {
            return Err(SetpointRejection::HeatTriggerNotBelowCoolTarget {
                heat_trigger: value,
                cool_target: self.cool_target_temp,
            });
        }
        if value >= self.heat_target_temp {
            return Err(SetpointRejection::HeatTargetNotAboveTrigger {
                target: self.heat_target_temp,
                trigger: value,
            });
        }
        self.commit(ComfortBands { heat_trigger_temp: value, ..*self })
    }

    pub fn set_heat_target(&mut self, value: i32) -> Result<(), SetpointRejection> {
        check_range(SetpointField::HeatTarget, value)?;
        if value <= self.heat_trigger_temp {
            return Err(SetpointRejection::HeatTargetNotAboveTrigger {
                target: value,
                trigger: self.heat_trigger_temp,
            });
        }
        if self.cooling_enabled && value > self.cool_target_temp {
            return Err(SetpointRejection::BandsOverlap {
                heat_target: value,
                cool_target: self.cool_target_temp,
            });
        }
        self.commit(ComfortBands { heat_target_temp: value, ..*self })
    }

    /// Turns cooling on or off. Turning it on while heating is active moves
    /// the cooling band just above the heat target if it would otherwise
    /// overlap.
    pub fn set_cooling_enabled(&mut self, enabled: bool) -> Result<(), SetpointRejection> {
        let mut next = ComfortBands { cooling_enabled: enabled, ..*self };
        if enabled && self.heating_enabled && next.cool_target_temp <= next.heat_target_temp {
            let target = next.heat_target_temp + 1;
            let trigger = next.heat_target_temp + 2;
            if trigger > MAX_TEMP {
                return Err(SetpointRejection::NoRoomForBand(Band::Cooling));
            }
            next.cool_target_temp = target;
            next.cool_trigger_temp = trigger;
        }
        self.commit(next)
    }

    /// Turns heating on or off. Turning it on while cooling is active moves
    /// the heating band just below the cool target if it would otherwise
    /// overlap.
    pub fn set_heating_enabled(&mut self, enabled: bool) -> Result<(), SetpointRejection> {
        let mut next = ComfortBands { heating_enabled: enabled, ..*self };
        if enabled && self.cooling_enabled && next.heat_target_temp >= next.cool_target_temp {
            let target = next.cool_target_temp - 1;
            let trigger = next.cool_target_temp - 2;
            if trigger < MIN_TEMP {
                return Err(SetpointRejection::NoRoomForBand(Band::Heating));
            }
            next.heat_target_temp = target;
            next.heat_trigger_temp = trigger;
        }
        self.commit(next)
    }

    pub fn apply(&mut self, change: SetpointChange) -> Result<(), SetpointRejection> {
        match change {
            SetpointChange::CoolingEnabled(on) => self.set_cooling_enabled(on),
            SetpointChange::HeatingEnabled(on) => self.set_heating_enabled(on),
            SetpointChange::CoolTrigger(v) => self.set_cool_trigger(v),
            SetpointChange::CoolTarget(v) => self.set_cool_target(v),
            SetpointChange::HeatTrigger(v) => self.set_heat_trigger(v),
            SetpointChange::HeatTarget(v) => self.set_heat_target(v),
        }
    }

    /// Hysteresis decision for a measured room temperature.
    ///
    /// A running band keeps running until its target is reached; an idle
    /// environment only starts a band once its trigger is crossed.
    pub fn demand(&self, temperature: f64, current: HvacDemand) -> HvacDemand {
        match current {
            HvacDemand::Cooling
                if self.cooling_enabled && temperature > f64::from(self.cool_target_temp) =>
            {
                return HvacDemand::Cooling;
            }
            HvacDemand::Heating
                if self.heating_enabled && temperature < f64::from(self.heat_target_temp) =>
            {
                return HvacDemand::Heating;
            }
            _ => {}
        }

        if self.cooling_enabled && temperature >= f64::from(self.cool_trigger_temp) {
            HvacDemand::Cooling
        } else if self.heating_enabled && temperature <= f64::from(self.heat_trigger_temp) {
            HvacDemand::Heating
        } else {
            HvacDemand::Idle
        }
    }
}
