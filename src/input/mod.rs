/**
 * Operator input
 *
 * Joystick frames as delivered by the gamepad driver, the rising-edge
 * detector that turns button levels into press events, and the marker
 * pose feed reserved for offload alignment.
 */

pub mod edge;
pub mod pose;

pub use edge::{EdgeDetector, RisingEdges};
pub use pose::MarkerPose;

use std::str::FromStr;

use crate::error::Error;

/// One snapshot of the gamepad: axis values and button levels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoyFrame{
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

impl JoyFrame{
    pub fn new(axes: Vec<f32>, buttons: Vec<bool>) -> Self{
        Self{ axes, buttons }
    }

    /// Axis value, or 0.0 when the driver sent fewer axes
    pub fn axis(&self, index: usize) -> f32{
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    pub fn button(&self, index: usize) -> bool{
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

/// Parses `<axis>,<axis>,...|<button>,<button>,...` with buttons as 0/1
impl FromStr for JoyFrame{
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err>{
        let (axes_part, buttons_part) = line
            .trim()
            .split_once('|')
            .ok_or_else(|| Error::InvalidInput(format!("missing '|' in {:?}", line)))?;

        let axes = split_fields(axes_part)
            .map(|s|{
                s.parse::<f32>()
                    .map_err(|_| Error::InvalidInput(format!("bad axis value {:?}", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let buttons = split_fields(buttons_part)
            .map(|s| match s{
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(Error::InvalidInput(format!("bad button value {:?}", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JoyFrame{ axes, buttons })
    }
}

fn split_fields(part: &str) -> impl Iterator<Item = &str>{
    part.split(',').map(str::trim).filter(|s| !s.is_empty())
}
