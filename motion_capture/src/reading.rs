use libm::sqrt;

/// One 6-axis sample: acceleration in m/s², angular rate in rad/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl Reading {
    pub const fn new(ax: f64, ay: f64, az: f64, gx: f64, gy: f64, gz: f64) -> Self {
        Self { ax, ay, az, gx, gy, gz }
    }

    /// Euclidean norm of the acceleration vector.
    pub fn magnitude(&self) -> f64 {
        sqrt(self.ax * self.ax + self.ay * self.ay + self.az * self.az)
    }

    pub fn accel(&self) -> [f64; 3] {
        [self.ax, self.ay, self.az]
    }

    pub fn gyro(&self) -> [f64; 3] {
        [self.gx, self.gy, self.gz]
    }
}
