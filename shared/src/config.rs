/// World geometry and match timing. Client and server must agree on these.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub world_width: f64,
    pub world_height: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    pub ball_radius: f64,
    /// Gap between a side wall and the back of its paddle
    pub paddle_margin: f64,
    /// Paddle speed for discrete input (units/s)
    pub paddle_speed: f64,
    /// Serve speed and the floor for post-hit speed (units/s)
    pub ball_base_speed: f64,
    /// Ceiling for post-hit speed (units/s)
    pub ball_max_speed: f64,
    pub tick_rate_hz: u32,
    pub match_duration_secs: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 800.0,
            world_height: 600.0,
            paddle_width: 12.0,
            paddle_height: 90.0,
            ball_radius: 8.0,
            paddle_margin: 20.0,
            paddle_speed: 420.0,
            ball_base_speed: 360.0,
            ball_max_speed: 850.0,
            tick_rate_hz: 60,
            match_duration_secs: 300,
        }
    }
}

impl GameConfig {
    /// Largest legal paddle top coordinate.
    pub fn paddle_max_y(&self) -> f64 {
        self.world_height - self.paddle_height
    }

    /// Paddle top coordinate that centers it vertically.
    pub fn paddle_center_y(&self) -> f64 {
        self.paddle_max_y() / 2.0
    }

    /// X of the left paddle's hitting face.
    pub fn left_paddle_face(&self) -> f64 {
        self.paddle_margin + self.paddle_width
    }

    /// X of the right paddle's hitting face.
    pub fn right_paddle_face(&self) -> f64 {
        self.world_width - self.paddle_margin - self.paddle_width
    }

    /// Fixed simulation step in seconds.
    pub fn fixed_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        let dims = [
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("paddle_width", self.paddle_width),
            ("paddle_height", self.paddle_height),
            ("ball_radius", self.ball_radius),
            ("paddle_speed", self.paddle_speed),
            ("ball_base_speed", self.ball_base_speed),
            ("ball_max_speed", self.ball_max_speed),
        ];
        for (name, v) in dims {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!("{} must be finite and > 0", name));
            }
        }
        if !self.paddle_margin.is_finite() || self.paddle_margin < 0.0 {
            return Err("paddle_margin must be finite and >= 0".to_string());
        }
        if self.paddle_height >= self.world_height {
            return Err("paddle_height must be < world_height".to_string());
        }
        if self.left_paddle_face() >= self.right_paddle_face() {
            return Err("paddles overlap horizontally".to_string());
        }
        if self.ball_base_speed > self.ball_max_speed {
            return Err("ball_base_speed must be <= ball_max_speed".to_string());
        }
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.match_duration_secs == 0 {
            return Err("match_duration_secs must be > 0".to_string());
        }
        Ok(())
    }
}
