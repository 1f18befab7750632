use hessian_core::{Image, ImageView};

/// Sobel gradients, scaled by 1/8. The outermost ring of pixels is set to 0.
pub fn sobel_xy(input: ImageView<'_, f32>, deriv_x: &mut Image<f32>, deriv_y: &mut Image<f32>) {
    let (w, h) = (input.width(), input.height());
    deriv_x.reshape(w, h);
    deriv_y.reshape(w, h);
    deriv_x.fill(0.0);
    deriv_y.fill(0.0);
    if w < 3 || h < 3 {
        return;
    }

    for y in 1..h - 1 {
        let above = input.row(y - 1);
        let here = input.row(y);
        let below = input.row(y + 1);
        for x in 1..w - 1 {
            // Sobel X kernel: [-1, 0, 1; -2, 0, 2; -1, 0, 1]
            let gx = above[x + 1] + 2.0 * here[x + 1] + below[x + 1]
                - above[x - 1]
                - 2.0 * here[x - 1]
                - below[x - 1];
            // Sobel Y kernel: [-1, -2, -1; 0, 0, 0; 1, 2, 1]
            let gy = below[x - 1] + 2.0 * below[x] + below[x + 1]
                - above[x - 1]
                - 2.0 * above[x]
                - above[x + 1];
            deriv_x.set(x, y, gx / 8.0);
            deriv_y.set(x, y, gy / 8.0);
        }
    }
}

/// Second derivatives from 3-tap central differences. The outermost ring of
/// pixels is set to 0.
pub fn hessian_three(
    input: ImageView<'_, f32>,
    deriv_xx: &mut Image<f32>,
    deriv_yy: &mut Image<f32>,
    deriv_xy: &mut Image<f32>,
) {
    let (w, h) = (input.width(), input.height());
    for out in [&mut *deriv_xx, &mut *deriv_yy, &mut *deriv_xy] {
        out.reshape(w, h);
        out.fill(0.0);
    }
    if w < 3 || h < 3 {
        return;
    }

    for y in 1..h - 1 {
        let above = input.row(y - 1);
        let here = input.row(y);
        let below = input.row(y + 1);
        for x in 1..w - 1 {
            let centre = here[x];
            deriv_xx.set(x, y, here[x + 1] - 2.0 * centre + here[x - 1]);
            deriv_yy.set(x, y, below[x] - 2.0 * centre + above[x]);
            deriv_xy.set(x, y, (below[x + 1] - below[x - 1] - above[x + 1] + above[x - 1]) / 4.0);
        }
    }
}
