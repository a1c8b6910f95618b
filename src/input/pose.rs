use std::str::FromStr;

use crate::error::Error;

/// Pose of one detected fiducial marker relative to the camera
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarkerPose{
    pub id: u32,
    /// x, y, z in meters
    pub translation: [f64; 3],
    /// x, y, z, w quaternion
    pub rotation: [f64; 4],
}

impl MarkerPose{
    /// Straight-line distance from the camera
    pub fn distance(&self) -> f64{
        let [x, y, z] = self.translation;
        (x * x + y * y + z * z).sqrt()
    }
}

/// Parses `<id> <tx> <ty> <tz> <qx> <qy> <qz> <qw>`, whitespace separated
impl FromStr for MarkerPose{
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err>{
        let mut fields = line.split_whitespace();
        let id = fields
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidInput(format!("bad marker id in {:?}", line)))?;

        let values = fields
            .map(|s|{
                s.parse::<f64>()
                    .map_err(|_| Error::InvalidInput(format!("bad pose value {:?}", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() != 7{
            return Err(Error::InvalidInput(format!(
                "expected 7 pose values, got {}",
                values.len()
            )));
        }

        Ok(MarkerPose{
            id,
            translation: [values[0], values[1], values[2]],
            rotation: [values[3], values[4], values[5], values[6]],
        })
    }
}
